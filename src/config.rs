use crate::config_validator::ConfigValidator;
use crate::error::ConfigError;
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Environment {
    Development,
    Staging,
    Production,
    Test,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "coingate", version, about = "Rate-limited, caching market-data gateway")]
pub struct Config {
    /// Server bind address
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:3000")]
    pub bind_addr: SocketAddr,

    /// Redis connection URL for fleet-wide rate limiting; in-process counters when unset
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// Upper bound on Redis connect and increment round-trips
    #[arg(long, env = "REDIS_TIMEOUT", default_value = "2s", value_parser = humantime::parse_duration)]
    pub redis_timeout: Duration,

    /// Fixed rate limit window
    #[arg(long, env = "RATE_LIMIT_WINDOW", default_value = "60s", value_parser = humantime::parse_duration)]
    pub rate_limit_window: Duration,

    /// Requests allowed per client per window
    #[arg(long, env = "RATE_LIMIT_MAX", default_value_t = 10)]
    pub rate_limit_max: u64,

    /// Distinct clients tracked by the in-process limiter
    #[arg(long, env = "LOCAL_COUNTER_CAPACITY", default_value_t = 500)]
    pub local_counter_capacity: u64,

    /// Market-data provider base URL
    #[arg(long, env = "UPSTREAM_BASE_URL", default_value = crate::upstream::DEFAULT_BASE_URL)]
    pub upstream_base_url: String,

    /// Optional provider API key
    #[arg(long, env = "UPSTREAM_API_KEY", hide_env_values = true)]
    pub upstream_api_key: Option<String>,

    #[arg(long, env = "UPSTREAM_TIMEOUT", default_value = "10s", value_parser = humantime::parse_duration)]
    pub upstream_timeout: Duration,

    /// Number of coins returned by the coin list
    #[arg(long, env = "COIN_LIST_SIZE", default_value_t = 25)]
    pub coin_list_size: u32,

    /// Days of history in a market chart
    #[arg(long, env = "CHART_DAYS", default_value_t = 30)]
    pub chart_days: u32,

    /// TTL of cached coin lists and charts
    #[arg(long, env = "CACHE_TTL", default_value = "60s", value_parser = humantime::parse_duration)]
    pub cache_ttl: Duration,

    /// TTL of the cached top market cap leaderboard
    #[arg(long, env = "LEADERBOARD_CACHE_TTL", default_value = "15m", value_parser = humantime::parse_duration)]
    pub leaderboard_cache_ttl: Duration,

    /// Entries per response cache
    #[arg(long, env = "CACHE_CAPACITY", default_value_t = 500)]
    pub cache_capacity: u64,

    #[arg(long, env = "APP_ENV", value_enum, default_value_t = Environment::Development)]
    pub environment: Environment,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Load configuration from `.env`, environment variables and arguments
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Config::parse()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = self.redis_url() {
            ConfigValidator::validate_redis_url(url)?;
        }
        ConfigValidator::validate_bind_address(&self.bind_addr.to_string())?;
        ConfigValidator::validate_rate_limit(self.rate_limit_max, self.rate_limit_window)?;
        ConfigValidator::validate_capacity("local counter capacity", self.local_counter_capacity)?;
        ConfigValidator::validate_capacity("cache capacity", self.cache_capacity)?;
        ConfigValidator::validate_ttl("cache TTL", self.cache_ttl)?;
        ConfigValidator::validate_ttl("leaderboard cache TTL", self.leaderboard_cache_ttl)?;
        ConfigValidator::validate_upstream_url(&self.upstream_base_url)?;
        Ok(())
    }

    pub fn redis_url(&self) -> Option<&str> {
        self.redis_url.as_deref().filter(|url| !url.trim().is_empty())
    }

    /// Whole seconds clients should wait after a denial.
    pub fn retry_after_secs(&self) -> u64 {
        self.rate_limit_window.as_secs().max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse_from(["coingate"]);
        assert_eq!(config.rate_limit_window, Duration::from_secs(60));
        assert_eq!(config.rate_limit_max, 10);
        assert_eq!(config.local_counter_capacity, 500);
        assert_eq!(config.upstream_timeout, Duration::from_secs(10));
        assert_eq!(config.leaderboard_cache_ttl, Duration::from_secs(900));
        assert_eq!(config.environment, Environment::Development);
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = Config::parse_from([
            "coingate",
            "--rate-limit-max",
            "60",
            "--cache-ttl",
            "2m",
            "--environment",
            "production",
            "--redis-url",
            "redis://cache:6379",
        ]);
        assert_eq!(config.rate_limit_max, 60);
        assert_eq!(config.cache_ttl, Duration::from_secs(120));
        assert!(config.environment.is_production());
        assert_eq!(config.redis_url(), Some("redis://cache:6379"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blank_redis_url_means_in_process() {
        let config = Config::parse_from(["coingate", "--redis-url", " "]);
        assert_eq!(config.redis_url(), None);
    }

    #[test]
    fn test_validate_rejects_zero_limit() {
        let config = Config::parse_from(["coingate", "--rate-limit-max", "0"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_redis_scheme() {
        let config = Config::parse_from(["coingate", "--redis-url", "http://localhost:6379"]);
        assert!(config.validate().is_err());
    }
}
