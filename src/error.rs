use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Rejected startup configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid configuration: {0}")]
pub struct ConfigError(pub String);

/// Failures of the distributed counter store. These never reach a caller;
/// the counter store demotes itself to the in-process backend instead.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid Redis URL: {0}")]
    InvalidUrl(String),
    #[error("failed to connect to Redis: {0}")]
    Connect(String),
    #[error("Redis command failed: {0}")]
    Command(String),
    #[error("Redis operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Command(err.to_string())
    }
}

/// Raw outcome of a failed upstream call.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream responded with status {0}")]
    Status(u16),
    #[error("upstream transport error: {0}")]
    Transport(String),
    #[error("upstream response could not be decoded: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            UpstreamError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            UpstreamError::Status(status.as_u16())
        } else {
            UpstreamError::Transport(err.to_string())
        }
    }
}

/// Upstream failure translated into something a dashboard user can act on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("The market data provider is rate limiting requests. Please try again in a minute.")]
    RateLimited,
    #[error("The market data provider is currently unavailable. Please try again later.")]
    ServerUnavailable,
    #[error("Failed to fetch {operation} for {resource}")]
    Failed {
        operation: &'static str,
        resource: String,
    },
}

impl FetchError {
    pub fn from_upstream(err: &UpstreamError, operation: &'static str, resource: &str) -> Self {
        match err {
            UpstreamError::Status(429) => FetchError::RateLimited,
            UpstreamError::Status(status) if *status >= 500 => FetchError::ServerUnavailable,
            _ => FetchError::Failed {
                operation,
                resource: resource.to_string(),
            },
        }
    }
}

/// Every outcome of the market endpoint that is not a 200.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Too many requests, please try again later.")]
    RateLimitExceeded { retry_after_secs: u64 },
    #[error("{0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Upstream(#[from] FetchError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.to_string(),
        };
        let mut response = (status, Json(body)).into_response();

        if let ApiError::RateLimitExceeded { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }

        response
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_translation() {
        assert_eq!(
            FetchError::from_upstream(&UpstreamError::Status(429), "coin list", "usd"),
            FetchError::RateLimited
        );
        assert_eq!(
            FetchError::from_upstream(&UpstreamError::Status(503), "coin list", "usd"),
            FetchError::ServerUnavailable
        );
        assert_eq!(
            FetchError::from_upstream(&UpstreamError::Status(404), "market chart", "nope"),
            FetchError::Failed {
                operation: "market chart",
                resource: "nope".to_string()
            }
        );
        assert_eq!(
            FetchError::from_upstream(
                &UpstreamError::Transport("connection reset".into()),
                "coin list",
                "usd"
            )
            .to_string(),
            "Failed to fetch coin list for usd"
        );
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::RateLimitExceeded { retry_after_secs: 60 }.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::InvalidRequest("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Upstream(FetchError::ServerUnavailable).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_rate_limit_response_has_retry_after() {
        let response = ApiError::RateLimitExceeded { retry_after_secs: 60 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "60");
    }
}
