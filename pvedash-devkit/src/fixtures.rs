/*!
Builders de fixtures au format brut de l'API Proxmox

Produit exactement ce que renverraient `/cluster/resources?type=vm` et `/nodes`,
pour que les tests passent par le vrai chemin de désérialisation.
*/

use serde_json::{json, Value};

/// Entrée `/cluster/resources` (qemu ou lxc)
#[derive(Debug, Clone)]
pub struct GuestFixture {
    value: Value,
}

impl GuestFixture {
    fn new(kind: &str, vmid: u32, name: &str, node: &str) -> Self {
        Self {
            value: json!({
                "id": format!("{kind}/{vmid}"),
                "type": kind,
                "vmid": vmid,
                "name": name,
                "node": node,
                "status": "running",
                "template": 0,
            }),
        }
    }

    pub fn qemu(vmid: u32, name: &str, node: &str) -> Self {
        Self::new("qemu", vmid, name, node)
    }

    pub fn lxc(vmid: u32, name: &str, node: &str) -> Self {
        Self::new("lxc", vmid, name, node)
    }

    pub fn status(self, status: &str) -> Self {
        self.set("status", json!(status))
    }

    /// Champ brut, séparé par `;` comme chez Proxmox
    pub fn tags(self, raw: &str) -> Self {
        self.set("tags", json!(raw))
    }

    pub fn template(self) -> Self {
        self.set("template", json!(1))
    }

    pub fn uptime(self, secs: u64) -> Self {
        self.set("uptime", json!(secs))
    }

    pub fn cpu(self, fraction: f64, cores: u32) -> Self {
        self.set("cpu", json!(fraction)).set("maxcpu", json!(cores))
    }

    pub fn memory(self, used: u64, max: u64) -> Self {
        self.set("mem", json!(used)).set("maxmem", json!(max))
    }

    pub fn disk(self, used: u64, max: u64) -> Self {
        self.set("disk", json!(used)).set("maxdisk", json!(max))
    }

    pub fn set(mut self, key: &str, value: Value) -> Self {
        self.value[key] = value;
        self
    }

    pub fn build(self) -> Value {
        self.value
    }
}

/// Entrée `/nodes`
#[derive(Debug, Clone)]
pub struct NodeFixture {
    value: Value,
}

impl NodeFixture {
    pub fn online(node: &str) -> Self {
        Self {
            value: json!({
                "node": node,
                "status": "online",
                "type": "node",
                "level": "",
                "cpu": 0.05,
                "maxcpu": 16,
                "mem": 8_589_934_592u64,
                "maxmem": 34_359_738_368u64,
                "disk": 10_737_418_240u64,
                "maxdisk": 107_374_182_400u64,
                "uptime": 864_000,
                "ssl_fingerprint": "AA:BB:CC",
            }),
        }
    }

    pub fn offline(node: &str) -> Self {
        Self {
            value: json!({ "node": node, "status": "offline", "type": "node" }),
        }
    }

    pub fn build(self) -> Value {
        self.value
    }
}

/// Cluster de référence : deux noeuds, statuts et labels mélangés.
///
/// | vmid | node  | status  | tags         |
/// |------|-------|---------|--------------|
/// | 100  | host1 | running | prod;web     |
/// | 101  | host1 | stopped | prod;web     |
/// | 102  | host1 | running | dev          |
/// | 103  | host1 | running | (aucun)      |
/// | 200  | host2 | running | prod;web     |
/// | 201  | host2 | paused  | web          |
pub fn mixed_guests() -> Vec<Value> {
    vec![
        GuestFixture::qemu(100, "web-prod-01", "host1")
            .tags("prod;web")
            .uptime(90_061)
            .cpu(0.125, 4)
            .memory(1_610_612_736, 4_294_967_296)
            .disk(10_737_418_240, 34_359_738_368)
            .build(),
        GuestFixture::qemu(101, "web-prod-02", "host1").status("stopped").tags("web; prod").build(),
        GuestFixture::lxc(102, "dev-box", "host1").tags("dev").uptime(3_661).build(),
        GuestFixture::qemu(103, "scratch", "host1").uptime(45).build(),
        GuestFixture::qemu(200, "web-prod-03", "host2").tags("prod;web").build(),
        GuestFixture::lxc(201, "cache", "host2").status("paused").tags("web").build(),
    ]
}

pub fn mixed_nodes() -> Vec<Value> {
    vec![NodeFixture::online("host1").build(), NodeFixture::online("host2").build()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_builder() {
        let vm = GuestFixture::lxc(300, "ct", "host9").status("stopped").tags("a;b").template().build();
        assert_eq!(vm["id"], "lxc/300");
        assert_eq!(vm["type"], "lxc");
        assert_eq!(vm["status"], "stopped");
        assert_eq!(vm["tags"], "a;b");
        assert_eq!(vm["template"], 1);
    }

    #[test]
    fn test_mixed_cluster_shape() {
        let guests = mixed_guests();
        assert_eq!(guests.len(), 6);
        assert!(guests.iter().any(|g| g.get("tags").is_none()));
        assert_eq!(mixed_nodes().len(), 2);
    }
}
