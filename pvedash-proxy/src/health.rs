use serde::Serialize;
use std::time::Instant;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

#[derive(Debug, Serialize)]
pub struct ProxyHealth {
    pub status: &'static str,
    pub timestamp: String,
    pub uptime_seconds: u64,
}

/// Santé du proxy lui-même ; ne touche jamais l'upstream.
#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self { start_time: Instant::now() }
    }

    pub fn get_health(&self) -> ProxyHealth {
        ProxyHealth {
            status: "ok",
            timestamp: OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new()
    }
}
