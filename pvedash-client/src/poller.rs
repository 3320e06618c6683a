//! Fixed-interval polling of the proxy
//!
//! One loop owns both the timer and the manual refresh channel, so at most
//! one poll is ever in flight. Ticks that fire during a slow poll are skipped.

use crate::api::{ClientError, ProxyClient, Snapshot};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// What the renderer sees
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    /// Last successful snapshot
    pub snapshot: Option<Snapshot>,
    /// Message of the last failed poll, cleared on success
    pub error: Option<String>,
    pub polls: u64,
}

impl DashboardState {
    pub fn apply(&mut self, result: Result<Snapshot, ClientError>) {
        self.polls += 1;
        match result {
            Ok(snapshot) => {
                self.snapshot = Some(snapshot);
                self.error = None;
            }
            Err(e) => self.error = Some(e.to_string()),
        }
    }
}

pub struct Poller {
    client: ProxyClient,
    period: Duration,
}

impl Poller {
    pub fn new(client: ProxyClient, period: Duration) -> Self {
        Self { client, period }
    }

    pub async fn poll_once(&self, state: &mut DashboardState) {
        let result = self.client.fetch_snapshot().await;
        match &result {
            Ok(s) => debug!("📡 poll ok: {} VMs, {} nodes", s.vms.len(), s.hosts.len()),
            Err(e) => warn!("⚠️ poll failed: {}", e),
        }
        state.apply(result);
    }

    /// Polls until every receiver of `tx` is gone. The first tick fires
    /// immediately. A message on `refresh` triggers an extra poll; a closed
    /// refresh channel leaves the timer running alone.
    pub async fn run(self, tx: watch::Sender<DashboardState>, mut refresh: mpsc::Receiver<()>) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut state = DashboardState::default();
        let mut refresh_open = true;

        info!("🔄 polling every {}s", self.period.as_secs());
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                msg = refresh.recv(), if refresh_open => {
                    if msg.is_none() {
                        refresh_open = false;
                        continue;
                    }
                    debug!("manual refresh");
                }
                _ = tx.closed() => break,
            }

            self.poll_once(&mut state).await;
            if tx.send(state.clone()).is_err() {
                break;
            }
        }
        debug!("poller stopped");
    }
}
