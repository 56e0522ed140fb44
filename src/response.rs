use crate::rate_limiter::Decision;
use axum::http::HeaderValue;
use axum::response::Response;
use serde::Serialize;

pub const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// Advertise the client's quota on an admitted response.
pub fn with_rate_limit_headers(mut response: Response, decision: &Decision) -> Response {
    let headers = response.headers_mut();
    headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(decision.remaining()));
    response
}

#[derive(Debug, Serialize)]
pub struct LoggedResponse {
    pub status: &'static str,
}

impl LoggedResponse {
    pub fn logged() -> Self {
        Self { status: "logged" }
    }
}
