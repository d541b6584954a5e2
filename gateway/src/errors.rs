use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response}
};
use lex_core::{FallbackReason, PolicyReason};
use observability::{TRACE_ID_HEADER, TraceId};
use serde::Serialize;
use thiserror::Error;

/// Stable machine codes of the error envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    Unauthorized,
    RateLimited,
    ProviderError,
    SourceUnavailable,
    PolicyBlocked
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            Self::ValidationError => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::ProviderError => StatusCode::BAD_GATEWAY,
            Self::SourceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::PolicyBlocked => StatusCode::UNPROCESSABLE_ENTITY
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::RateLimited => "RATE_LIMITED",
            Self::ProviderError => "PROVIDER_ERROR",
            Self::SourceUnavailable => "SOURCE_UNAVAILABLE",
            Self::PolicyBlocked => "POLICY_BLOCKED"
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Invalid request: {message}")]
    Validation { message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("No provider could answer the request (last failure: {reason})")]
    ProviderExhausted { reason: FallbackReason },

    #[error("Required legal sources are currently unavailable")]
    SourceUnavailable { reason: String },

    #[error("Request blocked by policy ({reason})")]
    PolicyBlocked { reason: PolicyReason }
}

impl GatewayError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into()
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into()
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { .. } => ErrorCode::ValidationError,
            Self::Unauthorized { .. } => ErrorCode::Unauthorized,
            Self::RateLimited { .. } => ErrorCode::RateLimited,
            Self::ProviderExhausted { .. } => ErrorCode::ProviderError,
            Self::SourceUnavailable { .. } => ErrorCode::SourceUnavailable,
            Self::PolicyBlocked { .. } => ErrorCode::PolicyBlocked
        }
    }

    pub fn policy_reason(&self) -> Option<PolicyReason> {
        match self {
            Self::PolicyBlocked { reason } => Some(*reason),
            _ => None
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Serialize)]
struct ErrorEnvelope<'a> {
    error: ErrorBody<'a>
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: ErrorCode,
    message: String,
    trace_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    policy_reason: Option<PolicyReason>
}

/// A `GatewayError` bound to the request's trace id. The header and the body
/// are rendered from the same `TraceId` value.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub error: GatewayError,
    pub trace_id: TraceId
}

impl ApiError {
    pub fn new(error: GatewayError, trace_id: TraceId) -> Self {
        Self { error, trace_id }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.error.code();
        let body = ErrorEnvelope {
            error: ErrorBody {
                code,
                message: self.error.to_string(),
                trace_id: self.trace_id.as_str(),
                policy_reason: self.error.policy_reason()
            }
        };

        let mut response = (code.status(), Json(body)).into_response();
        let headers = response.headers_mut();
        if let Ok(value) = HeaderValue::from_str(self.trace_id.as_str()) {
            headers.insert(TRACE_ID_HEADER, value);
        }
        if let GatewayError::RateLimited { retry_after_secs } = self.error {
            headers.insert(RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}
