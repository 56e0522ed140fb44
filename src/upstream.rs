//! The market-data provider: its endpoints, payload shapes and HTTP client.

use crate::currency::Currency;
use crate::error::UpstreamError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// One row of `/coins/markets`. Fields the dashboard does not read are kept
/// verbatim in `extra` so responses pass through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinMarket {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub total_volume: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_change_percentage_24h_in_currency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_change_percentage_7d_in_currency: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `/coins/{id}/market_chart`: `[timestamp_ms, value]` series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketChart {
    pub prices: Vec<[f64; 2]>,
    pub market_caps: Vec<[f64; 2]>,
    pub total_volumes: Vec<[f64; 2]>,
}

/// A decoded upstream payload, serialized exactly as the provider sent it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MarketData {
    Coins(Arc<Vec<CoinMarket>>),
    Chart(Arc<MarketChart>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Top `per_page` coins by market cap, optionally with 24h/7d change.
    CoinMarkets {
        currency: Currency,
        per_page: u32,
        with_price_change: bool,
    },
    MarketChart {
        coin_id: String,
        currency: Currency,
        days: u32,
    },
}

impl Endpoint {
    /// Path and query relative to the provider base URL. Inputs are already
    /// validated against allow-lists, so no escaping is needed.
    pub fn path_and_query(&self) -> String {
        match self {
            Endpoint::CoinMarkets {
                currency,
                per_page,
                with_price_change,
            } => {
                let mut path = format!(
                    "/coins/markets?vs_currency={}&order=market_cap_desc&per_page={}&page=1&sparkline=false",
                    currency, per_page
                );
                if *with_price_change {
                    path.push_str("&price_change_percentage=24h,7d");
                }
                path
            }
            Endpoint::MarketChart {
                coin_id,
                currency,
                days,
            } => format!(
                "/coins/{}/market_chart?vs_currency={}&days={}",
                coin_id, currency, days
            ),
        }
    }
}

#[async_trait]
pub trait MarketSource: Send + Sync {
    /// Fully-qualified URL of `endpoint`; doubles as the cache key.
    fn url(&self, endpoint: &Endpoint) -> String;

    async fn fetch(&self, endpoint: &Endpoint) -> Result<MarketData, UpstreamError>;
}

pub struct CoinGeckoClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl CoinGeckoClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        api_key: Option<String>,
    ) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn get_json<T>(&self, url: &str) -> Result<T, UpstreamError>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut request = self.http.get(url).header("accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("x-cg-demo-api-key", key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}

#[async_trait]
impl MarketSource for CoinGeckoClient {
    fn url(&self, endpoint: &Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path_and_query())
    }

    async fn fetch(&self, endpoint: &Endpoint) -> Result<MarketData, UpstreamError> {
        let url = self.url(endpoint);
        match endpoint {
            Endpoint::CoinMarkets { .. } => {
                let coins: Vec<CoinMarket> = self.get_json(&url).await?;
                Ok(MarketData::Coins(Arc::new(coins)))
            }
            Endpoint::MarketChart { .. } => {
                let chart: MarketChart = self.get_json(&url).await?;
                Ok(MarketData::Chart(Arc::new(chart)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coin_markets_path() {
        let endpoint = Endpoint::CoinMarkets {
            currency: Currency::Eur,
            per_page: 25,
            with_price_change: false,
        };
        assert_eq!(
            endpoint.path_and_query(),
            "/coins/markets?vs_currency=eur&order=market_cap_desc&per_page=25&page=1&sparkline=false"
        );
    }

    #[test]
    fn test_leaderboard_path_requests_price_change() {
        let endpoint = Endpoint::CoinMarkets {
            currency: Currency::Usd,
            per_page: 5,
            with_price_change: true,
        };
        assert!(endpoint
            .path_and_query()
            .ends_with("per_page=5&page=1&sparkline=false&price_change_percentage=24h,7d"));
    }

    #[test]
    fn test_url_joins_base_without_double_slash() {
        let client =
            CoinGeckoClient::new("http://localhost:9999/api/v3/", Duration::from_secs(1), None)
                .unwrap();
        let endpoint = Endpoint::MarketChart {
            coin_id: "bitcoin".into(),
            currency: Currency::Usd,
            days: 30,
        };
        assert_eq!(
            client.url(&endpoint),
            "http://localhost:9999/api/v3/coins/bitcoin/market_chart?vs_currency=usd&days=30"
        );
    }

    #[test]
    fn test_coin_market_keeps_unknown_fields() {
        let raw = serde_json::json!({
            "id": "bitcoin",
            "symbol": "btc",
            "name": "Bitcoin",
            "current_price": 64000.5,
            "market_cap": 1.2e12,
            "market_cap_rank": 1,
            "total_volume": 3.1e10,
            "image": "https://example.invalid/btc.png",
            "ath": null
        });
        let coin: CoinMarket = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(coin.market_cap_rank, Some(1));
        assert_eq!(coin.extra["image"], "https://example.invalid/btc.png");

        let back = serde_json::to_value(&coin).unwrap();
        assert_eq!(back["image"], raw["image"]);
        assert!(back.get("price_change_percentage_7d_in_currency").is_none());
    }
}
