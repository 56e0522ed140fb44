pub mod clock;
pub mod config;
pub mod config_validator;
pub mod counter_store;
pub mod currency;
pub mod error;
pub mod fetcher;
pub mod handlers;
pub mod health;
pub mod identity;
pub mod middleware;
pub mod rate_limiter;
pub mod redis;
pub mod response;
pub mod response_cache;
pub mod server;
pub mod upstream;
pub mod validation;

pub use config::Config;
pub use error::{ApiError, FetchError};
pub use rate_limiter::RateLimiter;
pub use server::{build_state, create_app};
