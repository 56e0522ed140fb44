//! Short-lived memo of upstream responses, keyed by the full upstream URL.
//!
//! Freshness is decided on read against the injected clock: an entry is only
//! served while `now - fetched_at < ttl`. moka's own time-to-live is set to
//! the same value so stale entries also get purged without a read.

use crate::clock::SharedClock;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub payload: T,
    pub fetched_at: u64,
}

pub struct ResponseCache<T> {
    entries: Cache<String, CacheEntry<T>>,
    ttl: Duration,
    clock: SharedClock,
}

impl<T> ResponseCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(capacity: u64, ttl: Duration, clock: SharedClock) -> Self {
        let entries = Cache::builder()
            .max_capacity(capacity)
            .eviction_policy(EvictionPolicy::lru())
            .time_to_live(ttl)
            .build();

        Self {
            entries,
            ttl,
            clock,
        }
    }

    /// Fresh payload for `key`, or `None` when absent or stale.
    pub fn get(&self, key: &str) -> Option<T> {
        let entry = self.entries.get(key)?;
        let age = self.clock.now_ms().saturating_sub(entry.fetched_at);
        if age < self.ttl.as_millis() as u64 {
            Some(entry.payload)
        } else {
            None
        }
    }

    /// Replace whatever is stored under `key`, stamped with the current time.
    pub fn set(&self, key: impl Into<String>, payload: T) {
        let entry = CacheEntry {
            payload,
            fetched_at: self.clock.now_ms(),
        };
        self.entries.insert(key.into(), entry);
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }
}
