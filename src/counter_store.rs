//! Per-identity fixed-window counters.
//!
//! Two backends answer the same question, "how many requests has this
//! identity made in its current window, counting this one":
//!
//! * [`LocalCounterStore`], a bounded LRU map owned by this process.
//! * [`RedisCounter`], shared by every process pointing at the same Redis.
//!
//! [`CounterStore`] picks one at construction. The first failure of the
//! distributed backend demotes the store to the local one for the rest of the
//! process lifetime; there is no path back.

use crate::clock::SharedClock;
use crate::redis::RedisCounter;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Request count for one identity within its current window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowCounter {
    pub identity: String,
    pub count: u64,
    pub window_start: u64,
}

/// In-process counters, evicting least recently used identities at capacity.
pub struct LocalCounterStore {
    counters: Cache<String, WindowCounter>,
    clock: SharedClock,
}

impl LocalCounterStore {
    pub fn new(capacity: u64, clock: SharedClock) -> Self {
        let counters = Cache::builder()
            .max_capacity(capacity)
            .eviction_policy(EvictionPolicy::lru())
            .build();

        Self { counters, clock }
    }

    /// Count one request for `identity` and return the count including it.
    ///
    /// The read-modify-write runs under moka's per-key lock, so concurrent
    /// increments for one identity never lose updates.
    pub fn increment(&self, identity: &str, window: Duration) -> u64 {
        let now = self.clock.now_ms();
        let window_ms = window.as_millis() as u64;

        let entry = self
            .counters
            .entry_by_ref(identity)
            .and_upsert_with(|existing| match existing.map(|e| e.into_value()) {
                Some(counter) if now.saturating_sub(counter.window_start) <= window_ms => {
                    WindowCounter {
                        count: counter.count + 1,
                        ..counter
                    }
                }
                _ => WindowCounter {
                    identity: identity.to_string(),
                    count: 1,
                    window_start: now,
                },
            });

        entry.into_value().count
    }

    pub fn get(&self, identity: &str) -> Option<WindowCounter> {
        self.counters.get(identity)
    }

    pub fn len(&self) -> u64 {
        self.counters.run_pending_tasks();
        self.counters.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Which backend is currently answering increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Distributed,
    InProcess,
}

pub enum CounterBackend {
    InProcess,
    Distributed(RedisCounter),
}

pub struct CounterStore {
    backend: CounterBackend,
    local: LocalCounterStore,
    demoted: AtomicBool,
}

impl CounterStore {
    pub fn in_process(local: LocalCounterStore) -> Self {
        Self {
            backend: CounterBackend::InProcess,
            local,
            demoted: AtomicBool::new(false),
        }
    }

    /// Use Redis when a URL is given and the client can be built, the local
    /// store otherwise.
    pub fn new(redis_url: Option<&str>, redis_timeout: Duration, local: LocalCounterStore) -> Self {
        let backend = match redis_url {
            Some(url) => match RedisCounter::new(url, redis_timeout) {
                Ok(counter) => CounterBackend::Distributed(counter),
                Err(e) => {
                    warn!(error = %e, "Distributed counter unavailable, using in-process counters");
                    CounterBackend::InProcess
                }
            },
            None => CounterBackend::InProcess,
        };

        Self {
            backend,
            local,
            demoted: AtomicBool::new(false),
        }
    }

    /// Count one request for `identity`. Never fails.
    pub async fn increment(&self, identity: &str, window: Duration) -> u64 {
        if let CounterBackend::Distributed(redis) = &self.backend {
            if !self.demoted.load(Ordering::Acquire) {
                match redis.increment(identity, window).await {
                    Ok(count) => return count,
                    Err(e) => self.demote(&e),
                }
            }
        }

        self.local.increment(identity, window)
    }

    fn demote(&self, cause: &crate::error::StoreError) {
        if !self.demoted.swap(true, Ordering::AcqRel) {
            warn!(
                error = %cause,
                "Distributed counter failed, falling back to in-process counters for the rest of this process"
            );
        } else {
            debug!(error = %cause, "Distributed counter failed after demotion");
        }
    }

    pub fn active_backend(&self) -> BackendKind {
        match self.backend {
            CounterBackend::Distributed(_) if !self.demoted.load(Ordering::Acquire) => {
                BackendKind::Distributed
            }
            _ => BackendKind::InProcess,
        }
    }

    pub fn configured_backend(&self) -> BackendKind {
        match self.backend {
            CounterBackend::Distributed(_) => BackendKind::Distributed,
            CounterBackend::InProcess => BackendKind::InProcess,
        }
    }

    pub fn is_demoted(&self) -> bool {
        self.demoted.load(Ordering::Acquire)
    }

    pub fn local(&self) -> &LocalCounterStore {
        &self.local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Arc;

    const WINDOW: Duration = Duration::from_secs(60);

    fn local_store(clock: &ManualClock) -> LocalCounterStore {
        LocalCounterStore::new(500, Arc::new(clock.clone()))
    }

    #[test]
    fn test_first_request_starts_window() {
        let clock = ManualClock::new(1_000_000);
        let store = local_store(&clock);

        assert_eq!(store.increment("1.2.3.4", WINDOW), 1);
        let counter = store.get("1.2.3.4").unwrap();
        assert_eq!(counter.identity, "1.2.3.4");
        assert_eq!(counter.window_start, 1_000_000);
    }

    #[test]
    fn test_counts_within_window_and_resets_after() {
        let clock = ManualClock::new(1_000_000);
        let store = local_store(&clock);

        for expected in 1..=5 {
            assert_eq!(store.increment("a", WINDOW), expected);
        }

        // exactly at the window edge still counts toward the same window
        clock.advance(WINDOW);
        assert_eq!(store.increment("a", WINDOW), 6);

        clock.advance(Duration::from_millis(1));
        assert_eq!(store.increment("a", WINDOW), 1);
        assert_eq!(store.get("a").unwrap().window_start, 1_060_001);
    }

    #[test]
    fn test_identities_are_independent() {
        let clock = ManualClock::new(0);
        let store = local_store(&clock);

        for _ in 0..20 {
            store.increment("j", WINDOW);
        }
        assert_eq!(store.increment("i", WINDOW), 1);
    }

    #[test]
    fn test_capacity_is_bounded() {
        let clock = ManualClock::new(0);
        let store = LocalCounterStore::new(10, Arc::new(clock.clone()));

        for i in 0..100 {
            store.increment(&format!("10.0.0.{}", i), WINDOW);
        }
        assert!(store.len() <= 10);
    }

    #[test]
    fn test_concurrent_increments_do_not_lose_updates() {
        let clock = ManualClock::new(0);
        let store = Arc::new(local_store(&clock));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        store.increment("shared", WINDOW);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get("shared").unwrap().count, 400);
    }

    #[tokio::test]
    async fn test_no_redis_url_uses_local() {
        let clock = ManualClock::new(0);
        let store = CounterStore::new(None, Duration::from_secs(1), local_store(&clock));

        assert_eq!(store.configured_backend(), BackendKind::InProcess);
        assert_eq!(store.increment("x", WINDOW).await, 1);
        assert_eq!(store.increment("x", WINDOW).await, 2);
    }

    #[tokio::test]
    async fn test_invalid_redis_url_uses_local() {
        let clock = ManualClock::new(0);
        let store = CounterStore::new(
            Some("not a redis url"),
            Duration::from_secs(1),
            local_store(&clock),
        );

        assert_eq!(store.active_backend(), BackendKind::InProcess);
        assert!(!store.is_demoted());
    }

    #[tokio::test]
    async fn test_redis_failure_demotes_permanently() {
        let clock = ManualClock::new(0);
        let store = CounterStore::new(
            Some("redis://127.0.0.1:1/"),
            Duration::from_secs(2),
            local_store(&clock),
        );
        assert_eq!(store.active_backend(), BackendKind::Distributed);

        assert_eq!(store.increment("y", WINDOW).await, 1);
        assert!(store.is_demoted());
        assert_eq!(store.active_backend(), BackendKind::InProcess);
        assert_eq!(store.configured_backend(), BackendKind::Distributed);

        assert_eq!(store.increment("y", WINDOW).await, 2);
        assert_eq!(store.local().get("y").unwrap().count, 2);
    }
}
