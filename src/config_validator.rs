use crate::error::ConfigError;
use std::time::Duration;

/// Validates configuration values for consistency and correctness
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates a Redis URL
    pub fn validate_redis_url(url: &str) -> Result<(), ConfigError> {
        if url.is_empty() {
            return Err(ConfigError("Redis URL cannot be empty".to_string()));
        }

        if !["redis://", "rediss://", "unix://"]
            .iter()
            .any(|scheme| url.starts_with(scheme))
        {
            return Err(ConfigError(
                "Redis URL must start with 'redis://', 'rediss://' or 'unix://'".to_string(),
            ));
        }

        Ok(())
    }

    /// Validates a bind address
    pub fn validate_bind_address(address: &str) -> Result<(), ConfigError> {
        if address.is_empty() {
            return Err(ConfigError("Bind address cannot be empty".to_string()));
        }

        // Check if it looks like host:port format
        if !address.contains(':') {
            return Err(ConfigError(
                "Bind address must be in host:port format".to_string(),
            ));
        }

        Ok(())
    }

    /// Validates fixed window parameters
    pub fn validate_rate_limit(max_requests: u64, window: Duration) -> Result<(), ConfigError> {
        if max_requests == 0 {
            return Err(ConfigError(
                "Max requests per window must be greater than 0".to_string(),
            ));
        }

        if window.as_millis() == 0 {
            return Err(ConfigError(
                "Rate limit window must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn validate_capacity(name: &str, capacity: u64) -> Result<(), ConfigError> {
        if capacity == 0 {
            return Err(ConfigError(format!("{} must be greater than 0", name)));
        }
        Ok(())
    }

    pub fn validate_ttl(name: &str, ttl: Duration) -> Result<(), ConfigError> {
        if ttl.as_millis() == 0 {
            return Err(ConfigError(format!("{} must be greater than 0", name)));
        }
        Ok(())
    }

    /// Validates the market-data provider base URL
    pub fn validate_upstream_url(url: &str) -> Result<(), ConfigError> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError(format!(
                "Upstream URL '{}' must start with 'http://' or 'https://'",
                url
            )));
        }

        Ok(())
    }
}
