//! Response shapes shared by the gate's middleware and handlers.

use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::error::TurnstileError;
use crate::ratelimit::RateLimitDecision;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TooManyRequestsBody<'a> {
    error: &'a str,
    message: &'a str,
    retry_after: u64,
}

/// A JSON `{ "error": message }` response.
pub fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorBody { error: message })).into_response()
}

/// Write the `X-RateLimit-*` headers for a decision.
///
/// When `overwrite` is false, headers already set by a more specific gate
/// are left alone.
pub fn set_rate_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision, overwrite: bool) {
    if !overwrite && headers.contains_key(X_RATELIMIT_LIMIT) {
        return;
    }
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(decision.reset_at));
}

/// The 429 returned for a denied request.
pub fn too_many_requests(decision: &RateLimitDecision, now_millis: u64, message: &str) -> Response {
    let retry_after = decision.retry_after_secs(now_millis);
    let body = TooManyRequestsBody {
        error: "Too Many Requests",
        message,
        retry_after,
    };

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    let headers = response.headers_mut();
    set_rate_limit_headers(headers, decision, true);
    headers.insert(RETRY_AFTER, HeaderValue::from(retry_after));
    response
}

impl IntoResponse for TurnstileError {
    fn into_response(self) -> Response {
        error!(error = %self, "Request failed");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}
