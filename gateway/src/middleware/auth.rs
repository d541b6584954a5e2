use std::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response}
};
use tracing::warn;

use super::trace::trace_id_of;
use crate::errors::ApiError;
use crate::state::AppState;

pub async fn chat_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next
) -> Response {
    let started = Instant::now();
    match state.auth.authenticate(request.headers()) {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(error) => {
            warn!(error = %error, "Chat request rejected");
            state.chat.record_rejection(&error, started);
            ApiError::new(error, trace_id_of(&request)).into_response()
        }
    }
}

pub async fn ops_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next
) -> Response {
    match state.auth.authorize_ops(request.headers()) {
        Ok(()) => next.run(request).await,
        Err(error) => {
            warn!(error = %error, path = %request.uri().path(), "Ops request rejected");
            ApiError::new(error, trace_id_of(&request)).into_response()
        }
    }
}
