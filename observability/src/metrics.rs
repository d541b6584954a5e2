use ::metrics::{counter, gauge, histogram};

/// `metrics` facade emissions. A no-op until the binary installs a recorder.
pub struct Metrics;

impl Metrics {
    pub fn record_request(outcome: &str) {
        counter!("lexgate_requests_total", "outcome" => outcome.to_string()).increment(1);
    }

    pub fn record_error(code: &str) {
        counter!("lexgate_errors_total", "code" => code.to_string()).increment(1);
    }

    pub fn record_latency(duration_ms: u64) {
        histogram!("lexgate_request_duration_ms").record(duration_ms as f64);
    }

    pub fn record_fallback() {
        counter!("lexgate_fallbacks_total").increment(1);
    }

    pub fn record_provider_call(provider: &str, result: &str) {
        counter!(
            "lexgate_provider_calls_total",
            "provider" => provider.to_string(),
            "result" => result.to_string()
        )
        .increment(1);
    }

    pub fn record_rate_limited() {
        counter!("lexgate_rate_limited_total").increment(1);
    }

    pub fn record_rate_limiter_degraded() {
        counter!("lexgate_rate_limiter_degraded_total").increment(1);
    }

    pub fn set_breaker_open(provider: &str, open: bool) {
        gauge!("lexgate_circuit_open", "provider" => provider.to_string())
            .set(if open { 1.0 } else { 0.0 });
    }
}
