//! Per-request trace identifiers.
//!
//! A `TraceId` is assigned at ingress and follows the request through every
//! log line, the `x-trace-id` response header and the error body.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub const TRACE_ID_HEADER: &str = "x-trace-id";

const MIN_INBOUND_LEN: usize = 8;
const MAX_INBOUND_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(String);

impl TraceId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accepts a caller-supplied id only if it is 8-64 chars of
    /// `[A-Za-z0-9-]`. Anything else would let callers inject log content.
    pub fn parse_inbound(value: &str) -> Option<Self> {
        let len = value.len();
        if !(MIN_INBOUND_LEN..=MAX_INBOUND_LEN).contains(&len) {
            return None;
        }
        if !value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
            return None;
        }
        Some(Self(value.to_string()))
    }

    /// Honours a valid inbound id, otherwise mints a fresh one.
    pub fn from_inbound_or_generate(value: Option<&str>) -> Self {
        value
            .and_then(Self::parse_inbound)
            .unwrap_or_else(Self::generate)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TraceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
