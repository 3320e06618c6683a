/*!
Helpers communs aux tests d'intégration
*/

use crate::fixtures::{mixed_guests, mixed_nodes};
use crate::upstream_stub::UpstreamStub;

/// Init logging pour tests (idempotent)
pub fn init_test_logging() {
    env_logger::builder().is_test(true).try_init().ok();
}

/// Démarre un faux upstream peuplé avec le cluster de référence
pub async fn start_mixed_cluster() -> anyhow::Result<UpstreamStub> {
    init_test_logging();
    let stub = UpstreamStub::start().await?;
    stub.set_guests(mixed_guests());
    stub.set_nodes(mixed_nodes());
    log::info!("📦 Mixed cluster loaded ({} guests)", mixed_guests().len());
    Ok(stub)
}
