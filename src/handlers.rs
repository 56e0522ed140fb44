use axum::{
    extract::{rejection::QueryRejection, ConnectInfo, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::error;

use crate::currency::{currency_options, CurrencyOption};
use crate::error::{ApiError, ApiResult};
use crate::fetcher::MarketFetcher;
use crate::health::{HealthChecker, HealthStatus};
use crate::identity::resolve_identity;
use crate::rate_limiter::RateLimiter;
use crate::response::{with_rate_limit_headers, LoggedResponse};
use crate::validation::{MarketQuery, MarketRequest};

/// Process-wide collaborators, built once by the server and shared by
/// every request.
#[derive(Clone)]
pub struct AppState {
    pub rate_limiter: RateLimiter,
    pub fetcher: Arc<MarketFetcher>,
    pub health: Arc<HealthChecker>,
    pub retry_after_secs: u64,
}

/// Market data entry point: admit, validate, then serve from cache or
/// upstream.
pub async fn market_data(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    query: Result<Query<MarketQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let identity = resolve_identity(&headers, peer.map(|ConnectInfo(addr)| addr));

    let decision = state.rate_limiter.check(&identity).await;
    if !decision.allowed {
        return Err(ApiError::RateLimitExceeded {
            retry_after_secs: state.retry_after_secs,
        });
    }

    let Query(query) = query.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    let request = query.into_request()?;

    let payload = match request {
        MarketRequest::Leaderboard { currency } => {
            state.fetcher.top_market_caps(currency).await?
        }
        MarketRequest::Chart { currency, coin_id } => {
            state.fetcher.market_chart(&coin_id, currency).await?
        }
        MarketRequest::CoinList { currency } => state.fetcher.coin_list(currency).await?,
    };

    Ok(with_rate_limit_headers(Json(payload).into_response(), &decision))
}

/// Supported quote currencies for the dashboard's selector.
pub async fn currencies() -> Json<Vec<CurrencyOption>> {
    Json(currency_options())
}

/// Error report posted by a dashboard client.
#[derive(Debug, Default, Deserialize)]
pub struct ClientErrorReport {
    pub error: Option<Value>,
    pub stack: Option<Value>,
    pub info: Option<Value>,
}

/// Record a client-side error. Always answers 200 so nothing leaks back.
pub async fn log_client_error(report: Option<Json<ClientErrorReport>>) -> Json<LoggedResponse> {
    let report = report.map(|Json(r)| r).unwrap_or_default();

    if let Some(Value::String(message)) = &report.error {
        error!(
            target: "coingate::client",
            error = %message,
            stack = ?report.stack,
            info = ?report.info,
            "Client error"
        );
    }

    Json(LoggedResponse::logged())
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(state.health.check_health())
}
