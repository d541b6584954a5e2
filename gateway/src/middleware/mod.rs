//! Request pipeline layers: trace id assignment, chat and ops
//! authentication, and rate-limit admission.

mod auth;
mod rate_limit;
mod trace;

pub use auth::{chat_auth_middleware, ops_auth_middleware};
pub use rate_limit::{RATE_LIMIT_DEGRADED_HEADER, rate_limit_middleware};
pub use trace::{trace_id_middleware, trace_id_of};
