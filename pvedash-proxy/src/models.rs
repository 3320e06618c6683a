//! Formes upstream (API Proxmox) et formes exposées par le proxy.

use crate::labels;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

/// Enveloppe standard Proxmox : `{ "data": ... }`
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuestKind {
    /// Virtualisation complète (QEMU/KVM)
    Qemu,
    /// Conteneur LXC
    Lxc,
}

impl GuestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuestKind::Qemu => "qemu",
            GuestKind::Lxc => "lxc",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "qemu" => Some(GuestKind::Qemu),
            "lxc" => Some(GuestKind::Lxc),
            _ => None,
        }
    }
}

/// Statut de cycle de vie. Les valeurs hors running/stopped/paused
/// sont conservées telles quelles (`Other`) pour rester filtrables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GuestStatus {
    Running,
    Stopped,
    Paused,
    Other(String),
}

impl GuestStatus {
    pub fn as_str(&self) -> &str {
        match self {
            GuestStatus::Running => "running",
            GuestStatus::Stopped => "stopped",
            GuestStatus::Paused => "paused",
            GuestStatus::Other(raw) => raw,
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "running" => GuestStatus::Running,
            "stopped" => GuestStatus::Stopped,
            "paused" => GuestStatus::Paused,
            _ => GuestStatus::Other(raw.to_string()),
        }
    }

    /// Statut absent côté upstream
    pub fn unknown() -> Self {
        GuestStatus::Other("unknown".to_string())
    }
}

impl From<String> for GuestStatus {
    fn from(raw: String) -> Self {
        GuestStatus::parse(&raw)
    }
}

impl From<GuestStatus> for String {
    fn from(status: GuestStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Entrée de `GET /cluster/resources?type=vm`
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamGuest {
    pub vmid: u32,
    #[serde(default)]
    pub name: Option<String>,
    pub node: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub kind: GuestKind,
    #[serde(default)]
    pub uptime: Option<u64>,
    #[serde(default)]
    pub cpu: Option<f64>,
    #[serde(default)]
    pub maxcpu: Option<f64>,
    #[serde(default)]
    pub mem: Option<u64>,
    #[serde(default)]
    pub maxmem: Option<u64>,
    #[serde(default)]
    pub disk: Option<u64>,
    #[serde(default)]
    pub maxdisk: Option<u64>,
    #[serde(default)]
    pub netin: Option<u64>,
    #[serde(default)]
    pub netout: Option<u64>,
    #[serde(default)]
    pub diskread: Option<u64>,
    #[serde(default)]
    pub diskwrite: Option<u64>,
    #[serde(default)]
    pub tags: Option<String>,
    // Proxmox envoie 0/1
    #[serde(default, deserialize_with = "int_flag")]
    pub template: bool,
}

/// Entrée de `GET /nodes`
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamNode {
    pub node: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub cpu: Option<f64>,
    #[serde(default)]
    pub maxcpu: Option<f64>,
    #[serde(default)]
    pub mem: Option<u64>,
    #[serde(default)]
    pub maxmem: Option<u64>,
    #[serde(default)]
    pub disk: Option<u64>,
    #[serde(default)]
    pub maxdisk: Option<u64>,
    #[serde(default)]
    pub uptime: Option<u64>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// Réponse de `GET /version`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamVersion {
    pub version: String,
    #[serde(default)]
    pub release: Option<String>,
}

/// VM telle qu'exposée par `GET /vms`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualMachine {
    pub vmid: u32,
    #[serde(default)]
    pub name: String,
    pub node: String,
    pub status: GuestStatus,
    #[serde(rename = "type")]
    pub kind: GuestKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpus: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxmem: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxdisk: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub netin: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub netout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diskread: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diskwrite: Option<u64>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub template: bool,
}

impl From<UpstreamGuest> for VirtualMachine {
    fn from(g: UpstreamGuest) -> Self {
        let tags = labels::decompose(g.tags.as_deref());
        Self {
            vmid: g.vmid,
            name: g.name.unwrap_or_default(),
            node: g.node,
            status: g.status.as_deref().filter(|s| !s.is_empty()).map(GuestStatus::parse).unwrap_or_else(GuestStatus::unknown),
            kind: g.kind,
            uptime: g.uptime,
            cpu: g.cpu,
            cpus: g.maxcpu,
            mem: g.mem,
            maxmem: g.maxmem,
            disk: g.disk,
            maxdisk: g.maxdisk,
            netin: g.netin,
            netout: g.netout,
            diskread: g.diskread,
            diskwrite: g.diskwrite,
            tags,
            template: g.template,
        }
    }
}

/// Noeud tel qu'exposé par `GET /nodes` (renommage seulement)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub node: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxcpu: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxmem: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxdisk: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl From<UpstreamNode> for Host {
    fn from(n: UpstreamNode) -> Self {
        Self {
            node: n.node,
            status: n.status.unwrap_or_else(|| "unknown".into()),
            cpu: n.cpu,
            maxcpu: n.maxcpu,
            mem: n.mem,
            maxmem: n.maxmem,
            disk: n.disk,
            maxdisk: n.maxdisk,
            uptime: n.uptime,
            level: n.level,
            kind: n.kind,
        }
    }
}

/// Config + statut runtime d'une VM, passés tels quels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestDetail {
    pub config: serde_json::Value,
    pub status: serde_json::Value,
}

fn int_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Null(()),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(i) => i != 0,
        Flag::Null(()) => false,
    })
}
