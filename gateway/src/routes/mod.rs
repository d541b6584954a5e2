use std::time::Instant;

use axum::{
    Extension, Json, Router,
    extract::{DefaultBodyLimit, State, rejection::JsonRejection},
    http::{Method, StatusCode, Uri, header::CONTENT_TYPE},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{get, post}
};
use lex_core::{ChatRequest, ChatResponse, EnvironmentTier};
use observability::{TelemetrySnapshot, TraceId};
use serde::Serialize;
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::circuit_breaker::BreakerSnapshot;
use crate::errors::{ApiError, GatewayError};
use crate::middleware::{
    chat_auth_middleware, ops_auth_middleware, rate_limit_middleware, trace_id_middleware
};
use crate::state::AppState;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Builds the HTTP surface. The chat route runs auth, then rate limiting;
/// ops routes run the ops token check; every route gets a trace id.
pub fn create_router(state: AppState) -> Router {
    let chat = Router::new()
        .route("/v1/chat", post(chat_handler))
        .route_layer(from_fn_with_state(state.clone(), rate_limit_middleware))
        .route_layer(from_fn_with_state(state.clone(), chat_auth_middleware));

    let ops = Router::new()
        .route("/ops/snapshot", get(ops_snapshot_handler))
        .route("/metrics", get(metrics_handler))
        .route_layer(from_fn_with_state(state.clone(), ops_auth_middleware));

    Router::new()
        .merge(chat)
        .merge(ops)
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .fallback(not_found_handler)
        .method_not_allowed_fallback(method_not_allowed_handler)
        .layer(DefaultBodyLimit::max(state.config.server.body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(trace_id_middleware))
        .with_state(state)
}

async fn chat_handler(
    State(state): State<AppState>,
    Extension(trace_id): Extension<TraceId>,
    payload: Result<Json<ChatRequest>, JsonRejection>
) -> Result<Json<ChatResponse>, ApiError> {
    let started = Instant::now();
    let Json(request) = payload.map_err(|rejection| {
        let error = GatewayError::validation(rejection.body_text());
        state.chat.record_rejection(&error, started);
        ApiError::new(error, trace_id.clone())
    })?;

    state
        .chat
        .handle(request)
        .await
        .map(Json)
        .map_err(|error| ApiError::new(error, trace_id))
}

#[derive(Debug, Serialize)]
struct OpsSnapshot {
    environment: EnvironmentTier,
    rate_limit_backend: &'static str,
    ready: bool,
    telemetry: TelemetrySnapshot,
    breakers: Vec<BreakerSnapshot>
}

async fn ops_snapshot_handler(State(state): State<AppState>) -> Json<OpsSnapshot> {
    Json(OpsSnapshot {
        environment: state.config.environment,
        rate_limit_backend: state.limiter.backend(),
        ready: state.router.is_ready(),
        telemetry: state.telemetry.snapshot(),
        breakers: state.router.breaker_snapshots()
    })
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.prometheus {
        Some(handle) => (
            [(CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
            handle.render()
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics exporter disabled\n").into_response()
    }
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn ready_handler(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    if state.router.is_ready() {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not_ready", "reason": "all provider breakers are open" }))
        )
    }
}

async fn not_found_handler(
    Extension(trace_id): Extension<TraceId>,
    method: Method,
    uri: Uri
) -> ApiError {
    ApiError::new(
        GatewayError::validation(format!("unknown route {method} {}", uri.path())),
        trace_id
    )
}

async fn method_not_allowed_handler(
    Extension(trace_id): Extension<TraceId>,
    method: Method,
    uri: Uri
) -> ApiError {
    ApiError::new(
        GatewayError::validation(format!("method {method} not allowed on {}", uri.path())),
        trace_id
    )
}
