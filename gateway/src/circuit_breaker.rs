//! Per-provider circuit breaker.
//!
//! `closed` passes calls and counts consecutive failures. At the threshold it
//! trips to `open` and fast-fails calls until the cool-down elapses. The next
//! call then becomes the single `half_open` probe: success closes the breaker,
//! failure reopens it with a longer cool-down.
//!
//! Every dispatched call hands its [`Permit`] back with its result. Only the
//! current probe can move the breaker out of `half_open`; results of calls
//! admitted earlier are counted but never close or reopen it.

use chrono::{DateTime, Utc};
use config::CircuitBreakerConfig;
use observability::Metrics;
use parking_lot::Mutex;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen
}

/// Admission decision for one call. `Probe` carries the probe's sequence
/// number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permit {
    Pass,
    Probe(u64),
    Rejected
}

impl Permit {
    pub fn is_probe(self) -> bool {
        matches!(self, Self::Probe(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub cooldown: Duration,
    pub backoff_multiplier: f64,
    pub max_cooldown: Duration,
    pub last_resort_probe: bool
}

impl BreakerSettings {
    pub fn from_config(config: &CircuitBreakerConfig, last_resort_probe: bool) -> Self {
        Self {
            failure_threshold: config.failure_threshold.max(1),
            cooldown: Duration::from_millis(config.cooldown_ms),
            backoff_multiplier: config.backoff_multiplier.max(1.0),
            max_cooldown: Duration::from_millis(config.max_cooldown_ms.max(config.cooldown_ms)),
            last_resort_probe
        }
    }
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self::from_config(&CircuitBreakerConfig::default(), true)
    }
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
    last_failure_at: Option<DateTime<Utc>>,
    cooldown_until: Option<Instant>,
    current_cooldown: Duration,
    probe_seq: u64,
    active_probe: Option<(u64, Instant)>
}

impl Inner {
    fn issue_probe(&mut self, now: Instant) -> Permit {
        self.probe_seq += 1;
        self.active_probe = Some((self.probe_seq, now));
        Permit::Probe(self.probe_seq)
    }

    fn owns_probe(&self, id: u64) -> bool {
        self.state == BreakerState::HalfOpen
            && self.active_probe.is_some_and(|(active, _)| active == id)
    }

    fn count_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_failure_at = Some(Utc::now());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakerSnapshot {
    pub provider: String,
    pub state: BreakerState,
    pub consecutive_failures: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub cooldown_remaining_ms: Option<u64>,
    pub current_cooldown_ms: u64
}

pub struct CircuitBreaker {
    provider: String,
    settings: BreakerSettings,
    probe_timeout: Duration,
    inner: Mutex<Inner>
}

impl CircuitBreaker {
    pub fn new(provider: impl Into<String>, settings: BreakerSettings) -> Self {
        let current_cooldown = settings.cooldown;
        Self {
            provider: provider.into(),
            settings,
            probe_timeout: Duration::ZERO,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                last_failure_at: None,
                cooldown_until: None,
                current_cooldown,
                probe_seq: 0,
                active_probe: None
            })
        }
    }

    /// Longest time one attempt against this provider may run. A probe is
    /// only replaced once it is older than both this and the cool-down.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn state(&self) -> BreakerState {
        self.inner.lock().state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.inner.lock().consecutive_failures
    }

    /// Decides whether a call may be dispatched. `last_resort` marks the final
    /// remaining candidate of a chain, which may be probed early when the
    /// settings allow it.
    pub fn acquire(&self, last_resort: bool) -> Permit {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let state = inner.state;

        match state {
            BreakerState::Closed => Permit::Pass,
            BreakerState::Open => {
                let elapsed = inner.cooldown_until.is_none_or(|until| now >= until);
                if elapsed || (last_resort && self.settings.last_resort_probe) {
                    inner.state = BreakerState::HalfOpen;
                    tracing::info!(
                        provider = %self.provider,
                        last_resort = !elapsed,
                        "Circuit half-open, dispatching probe"
                    );
                    inner.issue_probe(now)
                } else {
                    Permit::Rejected
                }
            }
            BreakerState::HalfOpen => {
                // A probe whose caller was dropped never reports back.
                let window = inner.current_cooldown.max(self.probe_timeout);
                let abandoned = inner
                    .active_probe
                    .is_none_or(|(_, started)| now.duration_since(started) >= window);
                if abandoned {
                    tracing::info!(provider = %self.provider, "Replacing abandoned probe");
                    inner.issue_probe(now)
                } else {
                    Permit::Rejected
                }
            }
        }
    }

    pub fn record_success(&self, permit: Permit) {
        let mut inner = self.inner.lock();
        match permit {
            Permit::Pass if inner.state == BreakerState::Closed => {
                inner.consecutive_failures = 0;
            }
            Permit::Probe(id) if inner.owns_probe(id) => {
                inner.state = BreakerState::Closed;
                inner.consecutive_failures = 0;
                inner.cooldown_until = None;
                inner.current_cooldown = self.settings.cooldown;
                inner.active_probe = None;
                drop(inner);

                tracing::info!(provider = %self.provider, "Circuit closed after successful probe");
                Metrics::set_breaker_open(&self.provider, false);
            }
            _ => {
                tracing::debug!(
                    provider = %self.provider,
                    state = ?inner.state,
                    "Ignoring success of a call admitted before the breaker tripped"
                );
            }
        }
    }

    pub fn record_failure(&self, permit: Permit) {
        if permit == Permit::Rejected {
            return;
        }

        let now = Instant::now();
        let mut inner = self.inner.lock();
        inner.count_failure();

        let opened = match permit {
            Permit::Pass => {
                if inner.state == BreakerState::Closed
                    && inner.consecutive_failures >= self.settings.failure_threshold
                {
                    inner.current_cooldown = self.settings.cooldown;
                    true
                } else {
                    false
                }
            }
            Permit::Probe(id) if inner.owns_probe(id) => {
                inner.current_cooldown = inner
                    .current_cooldown
                    .mul_f64(self.settings.backoff_multiplier)
                    .min(self.settings.max_cooldown);
                true
            }
            _ => false
        };

        if opened {
            inner.state = BreakerState::Open;
            inner.cooldown_until = Some(now + inner.current_cooldown);
            inner.active_probe = None;
            let failures = inner.consecutive_failures;
            let cooldown_ms = inner.current_cooldown.as_millis() as u64;
            drop(inner);

            tracing::warn!(
                provider = %self.provider,
                consecutive_failures = failures,
                cooldown_ms,
                "Circuit opened"
            );
            Metrics::set_breaker_open(&self.provider, true);
        }
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let now = Instant::now();
        let inner = self.inner.lock();
        BreakerSnapshot {
            provider: self.provider.clone(),
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            last_failure_at: inner.last_failure_at,
            cooldown_remaining_ms: inner
                .cooldown_until
                .filter(|_| inner.state == BreakerState::Open)
                .map(|until| until.saturating_duration_since(now).as_millis() as u64),
            current_cooldown_ms: inner.current_cooldown.as_millis() as u64
        }
    }
}
