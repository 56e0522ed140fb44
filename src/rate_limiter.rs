use crate::counter_store::CounterStore;
use crate::identity::ClientIdentity;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub count: u64,
    pub limit: u64,
}

impl Decision {
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.count)
    }
}

/// Fixed window counter: at most `max_requests` per identity per `window`.
///
/// The request that brings the count to exactly `max_requests` is admitted.
/// Up to twice the limit can slip through across a window boundary.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<CounterStore>,
    window: Duration,
    max_requests: u64,
}

impl RateLimiter {
    pub fn new(store: Arc<CounterStore>, window: Duration, max_requests: u64) -> Self {
        Self {
            store,
            window,
            max_requests,
        }
    }

    pub async fn check(&self, identity: &ClientIdentity) -> Decision {
        let count = self.store.increment(identity.as_str(), self.window).await;
        let allowed = count <= self.max_requests;

        if !allowed {
            debug!(identity = %identity, count, limit = self.max_requests, "Rate limit exceeded");
        }

        Decision {
            allowed,
            count,
            limit: self.max_requests,
        }
    }

    pub async fn is_allowed(&self, identity: &ClientIdentity) -> bool {
        self.check(identity).await.allowed
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_requests(&self) -> u64 {
        self.max_requests
    }

    pub fn store(&self) -> &CounterStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::counter_store::LocalCounterStore;
    use crate::identity::resolve_identity;
    use axum::http::HeaderMap;

    const WINDOW: Duration = Duration::from_secs(60);

    fn limiter(clock: &ManualClock, max: u64) -> RateLimiter {
        let local = LocalCounterStore::new(500, Arc::new(clock.clone()));
        RateLimiter::new(Arc::new(CounterStore::in_process(local)), WINDOW, max)
    }

    fn ip(addr: &str) -> ClientIdentity {
        ClientIdentity::from(addr.parse::<std::net::IpAddr>().unwrap())
    }

    #[tokio::test]
    async fn test_allows_up_to_limit_then_denies() {
        let clock = ManualClock::new(1_000_000);
        let limiter = limiter(&clock, 60);
        let client = ip("9.8.7.6");

        for _ in 0..60 {
            assert!(limiter.is_allowed(&client).await);
        }
        let decision = limiter.check(&client).await;
        assert!(!decision.allowed);
        assert_eq!(decision.remaining(), 0);
    }

    #[tokio::test]
    async fn test_window_expiry_resets_count() {
        let clock = ManualClock::new(1_000_000);
        let limiter = limiter(&clock, 10);
        let client = ip("2.2.2.2");

        for _ in 0..10 {
            assert!(limiter.is_allowed(&client).await);
        }
        assert!(!limiter.is_allowed(&client).await);

        clock.advance(WINDOW + Duration::from_millis(1));
        let decision = limiter.check(&client).await;
        assert!(decision.allowed);
        assert_eq!(decision.count, 1);
    }

    #[tokio::test]
    async fn test_identities_do_not_interfere() {
        let clock = ManualClock::new(0);
        let limiter = limiter(&clock, 3);
        let a = ip("1.1.1.1");
        let b = ip("2.2.2.2");

        for _ in 0..10 {
            limiter.check(&b).await;
        }
        assert!(limiter.is_allowed(&a).await);
        assert_eq!(limiter.check(&a).await.count, 2);
    }

    #[tokio::test]
    async fn test_unresolvable_requests_share_one_bucket() {
        let clock = ManualClock::new(0);
        let limiter = limiter(&clock, 2);
        let first = resolve_identity(&HeaderMap::new(), None);
        let second = resolve_identity(&HeaderMap::new(), None);

        assert!(limiter.is_allowed(&first).await);
        assert!(limiter.is_allowed(&second).await);
        assert!(!limiter.is_allowed(&first).await);
    }

    #[tokio::test]
    async fn test_fallback_still_enforces_limit() {
        let clock = ManualClock::new(0);
        let local = LocalCounterStore::new(500, Arc::new(clock.clone()));
        let store = CounterStore::new(Some("redis://127.0.0.1:1/"), Duration::from_secs(2), local);
        let limiter = RateLimiter::new(Arc::new(store), WINDOW, 5);
        let client = ip("4.4.4.4");

        for _ in 0..5 {
            assert!(limiter.is_allowed(&client).await);
        }
        assert!(!limiter.is_allowed(&client).await);
        assert!(limiter.store().is_demoted());
    }
}
