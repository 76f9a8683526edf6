//! Rate-Limit Middleware
//!
//! Counts every request against the caller's fixed window. Callers identify
//! themselves with the `x-client-id` header; everyone else shares the
//! `"anonymous"` budget.

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use super::handlers::AppState;
use crate::error::{CacheError, Result};

pub const CLIENT_ID_HEADER: &str = "x-client-id";
pub const ANONYMOUS_CLIENT: &str = "anonymous";

/// Rejects over-budget requests with 429 and annotates allowed responses
/// with `x-ratelimit-remaining` and `x-ratelimit-reset`.
pub async fn rate_limit(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response> {
    let client = req
        .headers()
        .get(CLIENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or(ANONYMOUS_CLIENT)
        .to_string();

    let policy = state.rate_limit;
    let decision = state
        .limiter
        .check_limit(&client, policy.requests, policy.window_ms);

    if !decision.allowed {
        warn!(client = %client, reset_time = decision.reset_time, "Rate limit exceeded");
        return Err(CacheError::RateLimited {
            reset_time: decision.reset_time,
        });
    }

    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(decision.reset_time));
    Ok(response)
}
