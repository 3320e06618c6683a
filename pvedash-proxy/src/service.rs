/**
 * SERVICE CLUSTER - Reshaping + filtrage au-dessus du client upstream
 *
 * RÔLE : Opérations métier exposées par l'API du proxy.
 * Pas de cache : chaque appel refait les requêtes upstream, deux appels
 * successifs peuvent donc voir deux états différents du cluster.
 */

use crate::error::ProxyError;
use crate::filter::VmFilter;
use crate::models::{GuestDetail, GuestKind, Host, UpstreamGuest, UpstreamVersion, VirtualMachine};
use crate::upstream::UpstreamClient;
use std::collections::BTreeSet;
use tracing::info;

#[derive(Clone)]
pub struct ClusterService {
    upstream: UpstreamClient,
}

impl ClusterService {
    pub fn new(upstream: UpstreamClient) -> Self {
        Self { upstream }
    }

    pub async fn list_virtual_machines(&self, filter: &VmFilter) -> Result<Vec<VirtualMachine>, ProxyError> {
        let raw = self
            .upstream
            .cluster_guests()
            .await
            .map_err(ProxyError::upstream("Failed to fetch VMs"))?;
        let total = raw.len();
        let vms = reshape_guests(raw, filter);
        info!("[service] {} VMs upstream, {} after filters", total, vms.len());
        Ok(vms)
    }

    pub async fn get_guest_config(
        &self,
        node: &str,
        vmid: u32,
        kind: GuestKind,
    ) -> Result<serde_json::Value, ProxyError> {
        self.upstream
            .guest_config(node, vmid, kind)
            .await
            .map_err(ProxyError::upstream("Failed to fetch VM config"))
    }

    pub async fn get_guest_runtime_status(
        &self,
        node: &str,
        vmid: u32,
        kind: GuestKind,
    ) -> Result<serde_json::Value, ProxyError> {
        self.upstream
            .guest_status(node, vmid, kind)
            .await
            .map_err(ProxyError::upstream("Failed to fetch VM status"))
    }

    /// Config et statut en parallèle ; l'échec de l'un fait échouer l'ensemble.
    pub async fn get_guest_detail(
        &self,
        node: &str,
        vmid: u32,
        kind: GuestKind,
    ) -> Result<GuestDetail, ProxyError> {
        let (config, status) = tokio::try_join!(
            self.get_guest_config(node, vmid, kind),
            self.get_guest_runtime_status(node, vmid, kind),
        )?;
        Ok(GuestDetail { config, status })
    }

    pub async fn list_hosts(&self) -> Result<Vec<Host>, ProxyError> {
        let nodes = self
            .upstream
            .nodes()
            .await
            .map_err(ProxyError::upstream("Failed to fetch nodes"))?;
        Ok(nodes.into_iter().map(Host::from).collect())
    }

    pub async fn list_distinct_labels(&self) -> Result<Vec<String>, ProxyError> {
        let raw = self
            .upstream
            .cluster_guests()
            .await
            .map_err(ProxyError::upstream("Failed to fetch tags"))?;
        Ok(distinct_labels(&reshape_guests(raw, &VmFilter::default())))
    }

    pub async fn probe_upstream(&self) -> Result<UpstreamVersion, ProxyError> {
        self.upstream
            .version()
            .await
            .map_err(ProxyError::upstream("Connection test failed"))
    }
}

/// Reshaping puis filtrage, dans l'ordre renvoyé par l'upstream.
pub fn reshape_guests(raw: Vec<UpstreamGuest>, filter: &VmFilter) -> Vec<VirtualMachine> {
    raw.into_iter()
        .map(VirtualMachine::from)
        .filter(|vm| filter.matches(vm))
        .collect()
}

/// Labels triés, sans doublon.
pub fn distinct_labels(vms: &[VirtualMachine]) -> Vec<String> {
    vms.iter()
        .flat_map(|vm| vm.tags.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
