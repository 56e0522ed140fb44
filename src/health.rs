use std::sync::Arc;
use std::time::SystemTime;
use serde::{Deserialize, Serialize};

use crate::counter_store::{BackendKind, CounterStore};
use crate::fetcher::MarketFetcher;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub counter_backend: BackendKind,
    pub cache_entries: u64,
}

static START_TIME: std::sync::LazyLock<SystemTime> = std::sync::LazyLock::new(SystemTime::now);

pub struct HealthChecker {
    counters: Arc<CounterStore>,
    fetcher: Arc<MarketFetcher>,
}

impl HealthChecker {
    pub fn new(counters: Arc<CounterStore>, fetcher: Arc<MarketFetcher>) -> Self {
        std::sync::LazyLock::force(&START_TIME);
        Self { counters, fetcher }
    }

    pub fn check_health(&self) -> HealthStatus {
        let now = SystemTime::now();
        let uptime = now.duration_since(*START_TIME)
            .unwrap_or_default()
            .as_secs();

        let active = self.counters.active_backend();

        // Demotion keeps serving with per-process limits, so it is degraded
        // rather than unhealthy.
        let overall_status = if active == self.counters.configured_backend() {
            "healthy"
        } else {
            "degraded"
        };

        HealthStatus {
            status: overall_status.to_string(),
            timestamp: now.duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: uptime,
            counter_backend: active,
            cache_entries: self.fetcher.cached_entries(),
        }
    }
}
