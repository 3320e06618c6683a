/*!
# PVEDash DevKit - Faux upstream Proxmox et fixtures pour les tests

Bibliothèque de test pour le proxy et le client :
- Serveur HTTP qui imite l'API `/api2/json` de Proxmox VE
- Injection de pannes (statut HTTP, corps invalide, latence)
- Builders JSON pour VMs/conteneurs/noeuds
*/

pub mod fixtures;
pub mod test_utils;
pub mod upstream_stub;

pub use fixtures::{GuestFixture, NodeFixture};
pub use test_utils::{init_test_logging, start_mixed_cluster};
pub use upstream_stub::{Failure, RecordedRequest, UpstreamStub};
