//! # Configuration Validation
//!
//! Field-level validation using the `validator` crate. Cross-field and
//! environment-dependent rules are enforced by [`crate::startup::enforce`].
//!
//! ## Validation Rules
//! - `server.port`: 1-65535, `server.body_limit_bytes`: 1 KiB - 1 MiB
//! - `rate_limit.requests_per_window`: 1-100000, `rate_limit.window_secs`: 1-3600
//! - `router.hard_timeout_ms`: 100-300000
//! - `circuit_breaker.failure_threshold`: 1-100, `backoff_multiplier`: 1.0-10.0,
//!   `cooldown_ms`: 1000-3600000
//! - `providers`: 1-8 entries, each `timeout_ms` 100-120000
//! - `grounding.top_k`: 1-50
//! - `observability.log_level`: trace/debug/info/warn/error
//! - `observability.log_format`: text/json

use crate::config::Config;
use validator::Validate;

pub fn validate(config: &Config) -> Result<(), validator::ValidationErrors> {
    config.validate()
}
