//! Fixed-window per-client admission control over a shared counter store,
//! with an in-process fallback when the shared store is unreachable.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use config::RateLimitConfig;
use lex_core::CounterStore;
use observability::TelemetryRecorder;
use storage::LocalCounterStore;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub retry_after_secs: u64,
    pub degraded: bool
}

pub struct RateLimiter {
    primary: Option<Arc<dyn CounterStore>>,
    local: LocalCounterStore,
    requests_per_window: u32,
    window_secs: u64,
    key_prefix: String,
    telemetry: Arc<TelemetryRecorder>
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

impl RateLimiter {
    /// `primary` is the shared store. Without one, counters stay in-process
    /// and decisions are never marked degraded.
    pub fn new(
        primary: Option<Arc<dyn CounterStore>>,
        config: &RateLimitConfig,
        telemetry: Arc<TelemetryRecorder>
    ) -> Self {
        Self {
            primary,
            local: LocalCounterStore::new(),
            requests_per_window: config.requests_per_window,
            window_secs: config.window_secs.max(1),
            key_prefix: config.key_prefix.clone(),
            telemetry
        }
    }

    pub fn backend(&self) -> &'static str {
        self.primary
            .as_ref()
            .map_or_else(|| self.local.backend(), |store| store.backend())
    }

    pub fn window_key(&self, client_key: &str, window_index: u64) -> String {
        format!("{}:{client_key}:{window_index}", self.key_prefix)
    }

    pub async fn admit(&self, client_key: &str) -> RateLimitDecision {
        self.admit_at(client_key, unix_now()).await
    }

    pub(crate) async fn admit_at(&self, client_key: &str, now_secs: u64) -> RateLimitDecision {
        let window_index = now_secs / self.window_secs;
        let key = self.window_key(client_key, window_index);
        let ttl = Duration::from_secs(self.window_secs);

        let mut degraded = false;
        let count = match &self.primary {
            Some(store) => match store.increment(&key, ttl).await {
                Ok(count) => Ok(count),
                Err(e) => {
                    warn!(
                        backend = store.backend(),
                        client_key,
                        error = %e,
                        "Counter store unavailable, falling back to in-process rate limiting"
                    );
                    self.telemetry.record_rate_limiter_degraded();
                    degraded = true;
                    self.local.increment(&key, ttl).await
                }
            },
            None => self.local.increment(&key, ttl).await
        };

        // LocalCounterStore never returns an error.
        let count = count.unwrap_or(1);

        let limit = u64::from(self.requests_per_window);
        let allowed = count <= limit;
        let remaining = u32::try_from(limit.saturating_sub(count)).unwrap_or(0);
        let retry_after_secs = (self.window_secs - now_secs % self.window_secs).max(1);

        if !allowed {
            self.telemetry.record_rate_limited();
        }

        RateLimitDecision {
            allowed,
            limit: self.requests_per_window,
            remaining,
            retry_after_secs,
            degraded
        }
    }
}
