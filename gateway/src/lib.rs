//! # Lexgate Gateway
//!
//! Request-time orchestration for legal-information chat: rate limiting,
//! policy screening, grounded generation with provider fallback and
//! citation enforcement, behind an axum HTTP surface.

pub mod auth;
pub mod chat;
pub mod circuit_breaker;
pub mod errors;
pub mod middleware;
pub mod policy;
pub mod rate_limit;
pub mod router;
pub mod routes;
pub mod server;
pub mod state;

pub use chat::{ChatService, ChatSettings};
pub use circuit_breaker::{BreakerSettings, BreakerSnapshot, BreakerState, CircuitBreaker, Permit};
pub use errors::{ApiError, ErrorCode, GatewayError, GatewayResult};
pub use policy::{CitationOutcome, PolicyComplianceEngine, SourceTrustPolicy};
pub use rate_limit::{RateLimitDecision, RateLimiter};
pub use router::{AttemptOutcome, AttemptRecord, ProviderRouter, RouteFailure, RouteSuccess};
pub use routes::create_router;
pub use state::{AppState, AppStateBuilder};
