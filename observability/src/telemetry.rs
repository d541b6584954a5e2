//! # Telemetry Recorder
//!
//! Process-wide, lock-free aggregation of request outcomes:
//! - a rolling window of one-second buckets (requests, errors, fallbacks, refusals)
//! - lifetime totals and per-error-code counts
//! - per-provider success/failure/fallback-success/skip counters
//! - a latency reservoir with p50/p95/p99
//! - rate limiter denials and degradations
//!
//! Every write is a handful of atomic operations. `snapshot()` reads the same
//! atomics and never blocks writers.

use crate::latency::{LatencyPercentiles, LatencyReservoir};
use crate::metrics::Metrics;
use dashmap::DashMap;
use lex_core::ProviderErrorKind;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Terminal outcome of one chat request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Answered,
    Refused,
    Error(&'static str)
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Answered => "answered",
            Self::Refused => "refused",
            Self::Error(_) => "error"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOutcome {
    pub kind: OutcomeKind,
    pub latency_ms: u64,
    pub fallback_used: bool
}

#[derive(Debug, Default)]
struct Bucket {
    epoch: AtomicU64,
    requests: AtomicU64,
    errors: AtomicU64,
    fallbacks: AtomicU64,
    refusals: AtomicU64
}

impl Bucket {
    fn reset(&self) {
        self.requests.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
        self.fallbacks.store(0, Ordering::Relaxed);
        self.refusals.store(0, Ordering::Relaxed);
    }
}

#[derive(Debug, Default)]
pub struct ProviderCounters {
    success: AtomicU64,
    failure: AtomicU64,
    fallback_success: AtomicU64,
    skipped: AtomicU64,
    timeouts: AtomicU64,
    rate_limited: AtomicU64
}

#[derive(Debug, Default)]
struct Totals {
    requests: AtomicU64,
    answered: AtomicU64,
    refused: AtomicU64,
    errors: AtomicU64,
    fallbacks: AtomicU64,
    rate_limited: AtomicU64,
    rate_limiter_degraded: AtomicU64
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WindowSnapshot {
    pub window_secs: u64,
    pub requests: u64,
    pub errors: u64,
    pub fallbacks: u64,
    pub refusals: u64,
    pub request_rate_per_sec: f64,
    pub error_rate: f64,
    pub fallback_rate: f64,
    pub refusal_rate: f64
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TotalsSnapshot {
    pub requests: u64,
    pub answered: u64,
    pub refused: u64,
    pub errors: u64,
    pub fallbacks: u64
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProviderSnapshot {
    pub success: u64,
    pub failure: u64,
    pub fallback_success: u64,
    pub skipped: u64,
    pub timeouts: u64,
    pub rate_limited: u64
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RateLimiterSnapshot {
    pub denied: u64,
    pub degraded: u64
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    pub window: WindowSnapshot,
    pub totals: TotalsSnapshot,
    pub errors_by_code: BTreeMap<String, u64>,
    pub providers: BTreeMap<String, ProviderSnapshot>,
    pub latency: LatencyPercentiles,
    pub rate_limiter: RateLimiterSnapshot
}

pub struct TelemetryRecorder {
    buckets: Box<[Bucket]>,
    totals: Totals,
    errors_by_code: DashMap<&'static str, AtomicU64>,
    providers: DashMap<String, Arc<ProviderCounters>>,
    latency: LatencyReservoir,
    emit_metrics: bool
}

impl TelemetryRecorder {
    pub fn new(window_secs: u64, latency_capacity: usize) -> Self {
        let window = window_secs.max(1) as usize;
        Self {
            buckets: (0..window).map(|_| Bucket::default()).collect(),
            totals: Totals::default(),
            errors_by_code: DashMap::new(),
            providers: DashMap::new(),
            latency: LatencyReservoir::new(latency_capacity),
            emit_metrics: true
        }
    }

    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.emit_metrics = enabled;
        self
    }

    pub fn window_secs(&self) -> u64 {
        self.buckets.len() as u64
    }

    /// Records the single terminal outcome of a request.
    pub fn record_outcome(&self, outcome: &RequestOutcome) {
        self.record_outcome_at(outcome, unix_now());
    }

    pub(crate) fn record_outcome_at(&self, outcome: &RequestOutcome, now_secs: u64) {
        let bucket = self.bucket_for(now_secs);
        bucket.requests.fetch_add(1, Ordering::Relaxed);
        self.totals.requests.fetch_add(1, Ordering::Relaxed);

        match outcome.kind {
            OutcomeKind::Answered => {
                self.totals.answered.fetch_add(1, Ordering::Relaxed);
            }
            OutcomeKind::Refused => {
                bucket.refusals.fetch_add(1, Ordering::Relaxed);
                self.totals.refused.fetch_add(1, Ordering::Relaxed);
            }
            OutcomeKind::Error(code) => {
                bucket.errors.fetch_add(1, Ordering::Relaxed);
                self.totals.errors.fetch_add(1, Ordering::Relaxed);
                self.errors_by_code
                    .entry(code)
                    .or_default()
                    .fetch_add(1, Ordering::Relaxed);
                if self.emit_metrics {
                    Metrics::record_error(code);
                }
            }
        }

        if outcome.fallback_used {
            bucket.fallbacks.fetch_add(1, Ordering::Relaxed);
            self.totals.fallbacks.fetch_add(1, Ordering::Relaxed);
            if self.emit_metrics {
                Metrics::record_fallback();
            }
        }

        self.latency.record(outcome.latency_ms);

        if self.emit_metrics {
            Metrics::record_request(outcome.kind.as_str());
            Metrics::record_latency(outcome.latency_ms);
        }
    }

    pub fn record_provider_success(&self, provider: &str, after_fallback: bool) {
        let counters = self.provider(provider);
        counters.success.fetch_add(1, Ordering::Relaxed);
        if after_fallback {
            counters.fallback_success.fetch_add(1, Ordering::Relaxed);
        }
        if self.emit_metrics {
            Metrics::record_provider_call(provider, "success");
        }
    }

    pub fn record_provider_failure(&self, provider: &str, kind: ProviderErrorKind) {
        let counters = self.provider(provider);
        counters.failure.fetch_add(1, Ordering::Relaxed);
        match kind {
            ProviderErrorKind::Timeout => {
                counters.timeouts.fetch_add(1, Ordering::Relaxed);
            }
            ProviderErrorKind::RateLimit => {
                counters.rate_limited.fetch_add(1, Ordering::Relaxed);
            }
            ProviderErrorKind::ProviderError => {}
        }
        if self.emit_metrics {
            Metrics::record_provider_call(provider, kind.as_ref());
        }
    }

    pub fn record_provider_skipped(&self, provider: &str) {
        self.provider(provider)
            .skipped
            .fetch_add(1, Ordering::Relaxed);
        if self.emit_metrics {
            Metrics::record_provider_call(provider, "circuit_open");
        }
    }

    pub fn record_rate_limited(&self) {
        self.totals.rate_limited.fetch_add(1, Ordering::Relaxed);
        if self.emit_metrics {
            Metrics::record_rate_limited();
        }
    }

    pub fn record_rate_limiter_degraded(&self) {
        self.totals
            .rate_limiter_degraded
            .fetch_add(1, Ordering::Relaxed);
        if self.emit_metrics {
            Metrics::record_rate_limiter_degraded();
        }
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.snapshot_at(unix_now())
    }

    pub(crate) fn snapshot_at(&self, now_secs: u64) -> TelemetrySnapshot {
        let window_secs = self.window_secs();
        let mut window = WindowSnapshot {
            window_secs,
            ..WindowSnapshot::default()
        };

        for bucket in &self.buckets {
            let epoch = bucket.epoch.load(Ordering::Acquire);
            if epoch == 0 || epoch > now_secs || now_secs - epoch >= window_secs {
                continue;
            }
            window.requests += bucket.requests.load(Ordering::Relaxed);
            window.errors += bucket.errors.load(Ordering::Relaxed);
            window.fallbacks += bucket.fallbacks.load(Ordering::Relaxed);
            window.refusals += bucket.refusals.load(Ordering::Relaxed);
        }
        if window.requests > 0 {
            let requests = window.requests as f64;
            window.request_rate_per_sec = requests / window_secs as f64;
            window.error_rate = window.errors as f64 / requests;
            window.fallback_rate = window.fallbacks as f64 / requests;
            window.refusal_rate = window.refusals as f64 / requests;
        }

        let errors_by_code = self
            .errors_by_code
            .iter()
            .map(|e| ((*e.key()).to_string(), e.value().load(Ordering::Relaxed)))
            .collect();

        let providers = self
            .providers
            .iter()
            .map(|e| {
                let c = e.value();
                (
                    e.key().clone(),
                    ProviderSnapshot {
                        success: c.success.load(Ordering::Relaxed),
                        failure: c.failure.load(Ordering::Relaxed),
                        fallback_success: c.fallback_success.load(Ordering::Relaxed),
                        skipped: c.skipped.load(Ordering::Relaxed),
                        timeouts: c.timeouts.load(Ordering::Relaxed),
                        rate_limited: c.rate_limited.load(Ordering::Relaxed)
                    }
                )
            })
            .collect();

        TelemetrySnapshot {
            window,
            totals: TotalsSnapshot {
                requests: self.totals.requests.load(Ordering::Relaxed),
                answered: self.totals.answered.load(Ordering::Relaxed),
                refused: self.totals.refused.load(Ordering::Relaxed),
                errors: self.totals.errors.load(Ordering::Relaxed),
                fallbacks: self.totals.fallbacks.load(Ordering::Relaxed)
            },
            errors_by_code,
            providers,
            latency: self.latency.percentiles(),
            rate_limiter: RateLimiterSnapshot {
                denied: self.totals.rate_limited.load(Ordering::Relaxed),
                degraded: self.totals.rate_limiter_degraded.load(Ordering::Relaxed)
            }
        }
    }

    fn provider(&self, name: &str) -> Arc<ProviderCounters> {
        if let Some(existing) = self.providers.get(name) {
            return existing.clone();
        }
        self.providers.entry(name.to_string()).or_default().clone()
    }

    /// Returns the bucket for `now_secs`, claiming and zeroing it first if it
    /// still belongs to an older second. Increments racing a rollover may be
    /// lost; the window is an approximation.
    fn bucket_for(&self, now_secs: u64) -> &Bucket {
        let bucket = &self.buckets[(now_secs % self.window_secs()) as usize];
        let epoch = bucket.epoch.load(Ordering::Acquire);
        if epoch < now_secs
            && bucket
                .epoch
                .compare_exchange(epoch, now_secs, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            bucket.reset();
        }
        bucket
    }
}

impl Default for TelemetryRecorder {
    fn default() -> Self {
        Self::new(300, 1024)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(kind: OutcomeKind, latency_ms: u64, fallback_used: bool) -> RequestOutcome {
        RequestOutcome {
            kind,
            latency_ms,
            fallback_used
        }
    }

    fn recorder() -> TelemetryRecorder {
        TelemetryRecorder::new(60, 128).with_metrics(false)
    }

    #[test]
    fn test_window_counts_outcomes() {
        let rec = recorder();
        let now = 1_700_000_000;

        rec.record_outcome_at(&outcome(OutcomeKind::Answered, 100, false), now);
        rec.record_outcome_at(&outcome(OutcomeKind::Answered, 200, true), now);
        rec.record_outcome_at(&outcome(OutcomeKind::Refused, 5, false), now + 1);
        rec.record_outcome_at(&outcome(OutcomeKind::Error("PROVIDER_ERROR"), 900, true), now + 2);

        let snap = rec.snapshot_at(now + 2);
        assert_eq!(snap.window.requests, 4);
        assert_eq!(snap.window.errors, 1);
        assert_eq!(snap.window.refusals, 1);
        assert_eq!(snap.window.fallbacks, 2);
        assert!((snap.window.error_rate - 0.25).abs() < f64::EPSILON);
        assert!((snap.window.fallback_rate - 0.5).abs() < f64::EPSILON);
        assert!((snap.window.refusal_rate - 0.25).abs() < f64::EPSILON);
        assert!((snap.window.request_rate_per_sec - 4.0 / 60.0).abs() < f64::EPSILON);
        assert_eq!(snap.errors_by_code.get("PROVIDER_ERROR"), Some(&1));
        assert_eq!(snap.totals.answered, 2);
    }

    #[test]
    fn test_window_forgets_old_buckets() {
        let rec = recorder();
        let now = 1_700_000_000;

        rec.record_outcome_at(&outcome(OutcomeKind::Answered, 10, false), now);
        rec.record_outcome_at(&outcome(OutcomeKind::Answered, 10, false), now + 30);

        let snap = rec.snapshot_at(now + 61);
        assert_eq!(snap.window.requests, 1);
        assert_eq!(snap.totals.requests, 2);
    }

    #[test]
    fn test_reused_bucket_is_reset() {
        let rec = recorder();
        let now = 1_700_000_000;

        rec.record_outcome_at(&outcome(OutcomeKind::Error("RATE_LIMITED"), 1, false), now);
        rec.record_outcome_at(&outcome(OutcomeKind::Answered, 1, false), now + 60);

        let snap = rec.snapshot_at(now + 60);
        assert_eq!(snap.window.requests, 1);
        assert_eq!(snap.window.errors, 0);
    }

    #[test]
    fn test_provider_counters() {
        let rec = recorder();
        rec.record_provider_failure("primary", ProviderErrorKind::Timeout);
        rec.record_provider_failure("primary", ProviderErrorKind::RateLimit);
        rec.record_provider_success("secondary", true);
        rec.record_provider_skipped("primary");

        let snap = rec.snapshot();
        let primary = &snap.providers["primary"];
        assert_eq!(primary.failure, 2);
        assert_eq!(primary.timeouts, 1);
        assert_eq!(primary.rate_limited, 1);
        assert_eq!(primary.skipped, 1);

        let secondary = &snap.providers["secondary"];
        assert_eq!(secondary.success, 1);
        assert_eq!(secondary.fallback_success, 1);
    }

    #[test]
    fn test_latency_percentiles_in_snapshot() {
        let rec = recorder();
        for ms in 1..=100 {
            rec.record_outcome(&outcome(OutcomeKind::Answered, ms, false));
        }

        let snap = rec.snapshot();
        assert_eq!(snap.latency.p50_ms, Some(50));
        assert_eq!(snap.latency.p95_ms, Some(95));
        assert_eq!(snap.latency.p99_ms, Some(99));
    }

    #[test]
    fn test_rate_limiter_counters() {
        let rec = recorder();
        rec.record_rate_limited();
        rec.record_rate_limited();
        rec.record_rate_limiter_degraded();

        let snap = rec.snapshot();
        assert_eq!(snap.rate_limiter.denied, 2);
        assert_eq!(snap.rate_limiter.degraded, 1);
    }

    #[test]
    fn test_concurrent_outcomes_are_counted() {
        let rec = Arc::new(recorder());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let rec = rec.clone();
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        rec.record_outcome(&outcome(OutcomeKind::Answered, 3, false));
                        rec.record_provider_success("primary", false);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snap = rec.snapshot();
        assert_eq!(snap.totals.requests, 2000);
        assert_eq!(snap.providers["primary"].success, 2000);
    }

    #[test]
    fn test_snapshot_serializes() {
        let rec = recorder();
        rec.record_outcome(&outcome(OutcomeKind::Refused, 2, false));
        let json = serde_json::to_value(rec.snapshot()).unwrap();
        assert_eq!(json["totals"]["refused"], 1);
        assert!(json["latency"]["p50_ms"].is_number());
    }
}
