//! # Observability
//!
//! In-process telemetry for the Lexgate orchestration core:
//! - Trace id assignment and inbound validation
//! - Rolling-window outcome counters and per-provider counters
//! - Latency percentiles
//! - `metrics` facade emissions for the Prometheus exporter

pub mod latency;
pub mod metrics;
pub mod telemetry;
pub mod trace;

pub use latency::{LatencyPercentiles, LatencyReservoir};
pub use metrics::Metrics;
pub use telemetry::{
    OutcomeKind, ProviderSnapshot, RequestOutcome, TelemetryRecorder, TelemetrySnapshot
};
pub use trace::{TRACE_ID_HEADER, TraceId};
