/**
 * FILTRES SERVEUR - Sélection des VMs avant renvoi au client
 *
 * SÉMANTIQUE :
 * - ET entre dimensions (host, status, labels)
 * - OU à l'intérieur de la liste de labels
 * - Une VM sans label ne passe jamais un filtre de labels non vide
 */

use crate::models::VirtualMachine;
use serde::Deserialize;
use std::collections::BTreeSet;

/// Ensemble non vide de labels recherchés.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelFilter(BTreeSet<String>);

impl LabelFilter {
    /// `None` si aucun label exploitable (le filtre n'existe pas vide).
    pub fn new<I, S>(labels: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: BTreeSet<String> = labels
            .into_iter()
            .map(|l| l.as_ref().trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        (!set.is_empty()).then_some(LabelFilter(set))
    }

    /// Paramètre de requête `tags=prod,web`
    pub fn parse_csv(raw: &str) -> Option<Self> {
        Self::new(raw.split(','))
    }

    pub fn matches(&self, labels: &BTreeSet<String>) -> bool {
        self.0.iter().any(|wanted| labels.contains(wanted))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn to_csv(&self) -> String {
        self.iter().collect::<Vec<_>>().join(",")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VmFilter {
    pub host: Option<String>,
    pub status: Option<String>,
    pub labels: Option<LabelFilter>,
}

impl VmFilter {
    pub fn is_empty(&self) -> bool {
        self.host.is_none() && self.status.is_none() && self.labels.is_none()
    }

    pub fn matches(&self, vm: &VirtualMachine) -> bool {
        if let Some(host) = &self.host {
            if vm.node != *host {
                return false;
            }
        }
        if let Some(status) = &self.status {
            if vm.status.as_str() != status {
                return false;
            }
        }
        match &self.labels {
            Some(labels) => labels.matches(&vm.tags),
            None => true,
        }
    }

    /// Paramètres de requête équivalents (pour `GET /vms`)
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(host) = &self.host {
            params.push(("node", host.clone()));
        }
        if let Some(status) = &self.status {
            params.push(("status", status.clone()));
        }
        if let Some(labels) = &self.labels {
            params.push(("tags", labels.to_csv()));
        }
        params
    }
}

/// Query string brute de `GET /vms`
#[derive(Debug, Default, Deserialize)]
pub struct VmQuery {
    pub node: Option<String>,
    pub status: Option<String>,
    pub tags: Option<String>,
}

impl From<VmQuery> for VmFilter {
    fn from(q: VmQuery) -> Self {
        let non_empty = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        VmFilter {
            host: non_empty(q.node),
            status: non_empty(q.status),
            labels: q.tags.as_deref().and_then(LabelFilter::parse_csv),
        }
    }
}
