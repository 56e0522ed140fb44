use crate::clock::{system_clock, SharedClock};
use crate::config::Config;
use crate::counter_store::{CounterStore, LocalCounterStore};
use crate::error::UpstreamError;
use crate::fetcher::{FetchSettings, MarketFetcher};
use crate::handlers::{currencies, health_check, log_client_error, market_data, AppState};
use crate::health::HealthChecker;
use crate::middleware::logging_middleware;
use crate::rate_limiter::RateLimiter;
use crate::response_cache::ResponseCache;
use crate::upstream::{CoinGeckoClient, MarketSource};
use axum::routing::{get, post};
use axum::{middleware, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub struct Server {
    app: Router,
    bind_addr: SocketAddr,
}

impl Server {
    pub fn new(config: Config) -> Result<Self, UpstreamError> {
        let source = CoinGeckoClient::new(
            config.upstream_base_url.clone(),
            config.upstream_timeout,
            config.upstream_api_key.clone(),
        )?;
        let state = build_state(&config, system_clock(), Arc::new(source));

        Ok(Self {
            app: create_app(state),
            bind_addr: config.bind_addr,
        })
    }

    pub async fn run(self) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;

        tracing::info!("coingate listening on {}", self.bind_addr);
        tracing::info!("Market data available at /api/market");
        tracing::info!("Health check available at /health");

        // Run server with graceful shutdown
        axum::serve(
            listener,
            self.app
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
    }
}

/// Wire the counter store, limiter, caches and fetcher for one process.
pub fn build_state(config: &Config, clock: SharedClock, source: Arc<dyn MarketSource>) -> AppState {
    let local = LocalCounterStore::new(config.local_counter_capacity, clock.clone());
    let counters = Arc::new(CounterStore::new(
        config.redis_url(),
        config.redis_timeout,
        local,
    ));
    tracing::info!(backend = ?counters.configured_backend(), "Rate limit counters ready");

    let rate_limiter = RateLimiter::new(
        counters.clone(),
        config.rate_limit_window,
        config.rate_limit_max,
    );

    let fetcher = Arc::new(MarketFetcher::new(
        source,
        ResponseCache::new(config.cache_capacity, config.cache_ttl, clock.clone()),
        ResponseCache::new(config.cache_capacity, config.leaderboard_cache_ttl, clock),
        FetchSettings {
            coin_list_size: config.coin_list_size,
            chart_days: config.chart_days,
            log_failures: !config.environment.is_production(),
        },
    ));

    let health = Arc::new(HealthChecker::new(counters, fetcher.clone()));

    AppState {
        rate_limiter,
        fetcher,
        health,
        retry_after_secs: config.retry_after_secs(),
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/api/market", get(market_data))
        .route("/api/currencies", get(currencies))
        .route("/api/log-error", post(log_client_error))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(logging_middleware)),
        )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}
