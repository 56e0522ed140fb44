use crate::currency::Currency;
use crate::error::FetchError;
use crate::response_cache::ResponseCache;
use crate::upstream::{Endpoint, MarketData, MarketSource};
use std::sync::Arc;
use tracing::{debug, error};

pub const LEADERBOARD_SIZE: u32 = 5;

#[derive(Debug, Clone, Copy)]
pub struct FetchSettings {
    pub coin_list_size: u32,
    pub chart_days: u32,
    /// Log upstream failure details server-side.
    pub log_failures: bool,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            coin_list_size: 25,
            chart_days: 30,
            log_failures: true,
        }
    }
}

/// Cache-or-fetch front for the market-data provider.
///
/// Coin lists and charts share the short-TTL cache; the leaderboard has its
/// own, longer-lived one.
pub struct MarketFetcher {
    source: Arc<dyn MarketSource>,
    cache: ResponseCache<MarketData>,
    leaderboard_cache: ResponseCache<MarketData>,
    settings: FetchSettings,
}

impl MarketFetcher {
    pub fn new(
        source: Arc<dyn MarketSource>,
        cache: ResponseCache<MarketData>,
        leaderboard_cache: ResponseCache<MarketData>,
        settings: FetchSettings,
    ) -> Self {
        Self {
            source,
            cache,
            leaderboard_cache,
            settings,
        }
    }

    /// Top coins by market cap.
    pub async fn coin_list(&self, currency: Currency) -> Result<MarketData, FetchError> {
        let endpoint = Endpoint::CoinMarkets {
            currency,
            per_page: self.settings.coin_list_size,
            with_price_change: false,
        };
        self.cached_fetch(&self.cache, endpoint, "coin list", currency.code())
            .await
    }

    /// Price, market cap and volume history for one coin.
    pub async fn market_chart(
        &self,
        coin_id: &str,
        currency: Currency,
    ) -> Result<MarketData, FetchError> {
        let endpoint = Endpoint::MarketChart {
            coin_id: coin_id.to_string(),
            currency,
            days: self.settings.chart_days,
        };
        self.cached_fetch(&self.cache, endpoint, "market chart", coin_id)
            .await
    }

    /// Top five coins with 24h and 7d change percentages.
    pub async fn top_market_caps(&self, currency: Currency) -> Result<MarketData, FetchError> {
        let endpoint = Endpoint::CoinMarkets {
            currency,
            per_page: LEADERBOARD_SIZE,
            with_price_change: true,
        };
        self.cached_fetch(
            &self.leaderboard_cache,
            endpoint,
            "top market caps",
            currency.code(),
        )
        .await
    }

    async fn cached_fetch(
        &self,
        cache: &ResponseCache<MarketData>,
        endpoint: Endpoint,
        operation: &'static str,
        resource: &str,
    ) -> Result<MarketData, FetchError> {
        let key = self.source.url(&endpoint);

        if let Some(hit) = cache.get(&key) {
            debug!(key = %key, "Cache hit");
            return Ok(hit);
        }

        debug!(key = %key, "Cache miss, fetching upstream");
        match self.source.fetch(&endpoint).await {
            Ok(payload) => {
                cache.set(key, payload.clone());
                Ok(payload)
            }
            Err(e) => {
                if self.settings.log_failures {
                    error!(operation, resource, error = %e, "Upstream fetch failed");
                }
                Err(FetchError::from_upstream(&e, operation, resource))
            }
        }
    }

    pub fn cached_entries(&self) -> u64 {
        self.cache.entry_count() + self.leaderboard_cache.entry_count()
    }
}
