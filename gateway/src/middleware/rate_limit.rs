use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response}
};
use tracing::info;

use super::trace::trace_id_of;
use crate::auth::Principal;
use crate::errors::{ApiError, GatewayError};
use crate::state::AppState;

pub const RATE_LIMIT_LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RATE_LIMIT_DEGRADED_HEADER: &str = "x-ratelimit-degraded";

/// Admits the authenticated principal before any downstream work.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next
) -> Response {
    let started = Instant::now();
    let client_key = request
        .extensions()
        .get::<Principal>()
        .map_or_else(|| "anonymous".to_string(), |p| p.client_key.clone());

    let decision = state.limiter.admit(&client_key).await;

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        let error = GatewayError::RateLimited {
            retry_after_secs: decision.retry_after_secs
        };
        info!(client_key = %client_key, retry_after_secs = decision.retry_after_secs, "Rate limit exceeded");
        state.chat.record_rejection(&error, started);
        ApiError::new(error, trace_id_of(&request)).into_response()
    };

    let headers = response.headers_mut();
    headers.insert(RATE_LIMIT_LIMIT_HEADER, HeaderValue::from(decision.limit));
    headers.insert(RATE_LIMIT_REMAINING_HEADER, HeaderValue::from(decision.remaining));
    if decision.degraded {
        headers.insert(RATE_LIMIT_DEGRADED_HEADER, HeaderValue::from_static("true"));
    }
    response
}
