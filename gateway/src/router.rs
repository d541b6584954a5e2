//! Ordered provider fallback with one circuit breaker per provider.

use crate::circuit_breaker::{BreakerSettings, BreakerSnapshot, BreakerState, CircuitBreaker, Permit};
use adapters::ProviderSlot;
use errors::ConfigError;
use lex_core::{
    EnvironmentTier, FallbackReason, FallbackUsed, GroundingCandidate, Prompt, ProposedCitation,
    ProviderAdapter, ProviderCallResult, ProviderErrorKind, ProviderOutcome
};
use observability::TelemetryRecorder;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

struct RouteEntry {
    adapter: Arc<dyn ProviderAdapter>,
    timeout: Duration,
    breaker: Arc<CircuitBreaker>
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "result", content = "kind")]
pub enum AttemptOutcome {
    Success,
    Failed(ProviderErrorKind),
    Skipped
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    pub provider: String,
    pub outcome: AttemptOutcome,
    pub latency_ms: u64
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSuccess {
    pub provider: String,
    pub answer: String,
    pub citations: Vec<ProposedCitation>,
    pub fallback_used: FallbackUsed,
    pub attempts: Vec<AttemptRecord>
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteFailure {
    pub last_reason: FallbackReason,
    pub first_reason: FallbackReason,
    pub attempts: Vec<AttemptRecord>
}

pub struct ProviderRouter {
    entries: Vec<RouteEntry>,
    hard_timeout: Duration,
    telemetry: Arc<TelemetryRecorder>
}

impl ProviderRouter {
    /// Builds the router over `slots` in order. Non-production adapters are
    /// dropped in hardened environments.
    pub fn new(
        slots: Vec<ProviderSlot>,
        environment: EnvironmentTier,
        settings: &BreakerSettings,
        hard_timeout: Duration,
        telemetry: Arc<TelemetryRecorder>
    ) -> Result<Self, ConfigError> {
        let hardened = environment.is_hardened();
        let entries: Vec<RouteEntry> = slots
            .into_iter()
            .filter(|slot| {
                let keep = !hardened || slot.adapter.is_production();
                if !keep {
                    tracing::info!(
                        provider = slot.adapter.name(),
                        environment = %environment,
                        "Excluding non-production provider from hardened chain"
                    );
                }
                keep
            })
            .map(|slot| RouteEntry {
                breaker: Arc::new(
                    CircuitBreaker::new(slot.adapter.name(), settings.clone())
                        .with_probe_timeout(slot.timeout)
                ),
                adapter: slot.adapter,
                timeout: slot.timeout
            })
            .collect();

        if entries.is_empty() {
            return Err(ConfigError::EmptyProviderChain {
                environment: environment.to_string()
            });
        }

        Ok(Self {
            entries,
            hard_timeout,
            telemetry
        })
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.adapter.name()).collect()
    }

    pub fn breaker(&self, provider: &str) -> Option<Arc<CircuitBreaker>> {
        self.entries
            .iter()
            .find(|e| e.adapter.name() == provider)
            .map(|e| e.breaker.clone())
    }

    pub fn breaker_snapshots(&self) -> Vec<BreakerSnapshot> {
        self.entries.iter().map(|e| e.breaker.snapshot()).collect()
    }

    /// True while at least one provider can take traffic.
    pub fn is_ready(&self) -> bool {
        self.entries
            .iter()
            .any(|e| e.breaker.state() != BreakerState::Open)
    }

    /// Effective aggregate deadline: the sum of per-provider budgets, capped
    /// by the hard ceiling.
    pub fn aggregate_budget(&self) -> Duration {
        let soft: Duration = self.entries.iter().map(|e| e.timeout).sum();
        soft.min(self.hard_timeout)
    }

    pub async fn route(
        &self,
        prompt: &Prompt,
        candidates: &[GroundingCandidate]
    ) -> Result<RouteSuccess, RouteFailure> {
        let deadline = Instant::now() + self.aggregate_budget();
        let last_index = self.entries.len() - 1;
        let mut attempts = Vec::with_capacity(self.entries.len());
        let mut first_reason: Option<FallbackReason> = None;
        let mut last_reason = FallbackReason::ProviderError;

        for (index, entry) in self.entries.iter().enumerate() {
            let name = entry.adapter.name();
            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(provider = name, "Aggregate provider deadline exceeded");
                first_reason.get_or_insert(FallbackReason::Timeout);
                last_reason = FallbackReason::Timeout;
                break;
            }

            let permit = entry.breaker.acquire(index == last_index);
            if permit == Permit::Rejected {
                tracing::info!(provider = name, "Skipping provider, circuit open");
                self.telemetry.record_provider_skipped(name);
                attempts.push(AttemptRecord {
                    provider: name.to_string(),
                    outcome: AttemptOutcome::Skipped,
                    latency_ms: 0
                });
                first_reason.get_or_insert(FallbackReason::CircuitOpen);
                last_reason = FallbackReason::CircuitOpen;
                continue;
            }

            let attempt_timeout = entry.timeout.min(deadline - now);
            let result = self.attempt(entry, prompt, candidates, attempt_timeout).await;

            match result.outcome {
                ProviderOutcome::Success { answer, citations } => {
                    entry.breaker.record_success(permit);
                    let used = first_reason.is_some();
                    self.telemetry.record_provider_success(name, used);
                    attempts.push(AttemptRecord {
                        provider: name.to_string(),
                        outcome: AttemptOutcome::Success,
                        latency_ms: result.latency_ms
                    });
                    tracing::info!(
                        provider = name,
                        fallback_used = used,
                        latency_ms = result.latency_ms,
                        "Provider answered"
                    );

                    return Ok(RouteSuccess {
                        provider: name.to_string(),
                        answer,
                        citations,
                        fallback_used: FallbackUsed {
                            used,
                            provider: Some(name.to_string()),
                            reason: first_reason
                        },
                        attempts
                    });
                }
                ProviderOutcome::Failure { kind, detail } => {
                    entry.breaker.record_failure(permit);
                    self.telemetry.record_provider_failure(name, kind);
                    attempts.push(AttemptRecord {
                        provider: name.to_string(),
                        outcome: AttemptOutcome::Failed(kind),
                        latency_ms: result.latency_ms
                    });
                    tracing::warn!(
                        provider = name,
                        reason = %kind,
                        detail = %detail,
                        "Provider attempt failed, advancing chain"
                    );
                    let reason = FallbackReason::from(kind);
                    first_reason.get_or_insert(reason);
                    last_reason = reason;
                }
            }
        }

        Err(RouteFailure {
            last_reason,
            first_reason: first_reason.unwrap_or(last_reason),
            attempts
        })
    }

    async fn attempt(
        &self,
        entry: &RouteEntry,
        prompt: &Prompt,
        candidates: &[GroundingCandidate],
        timeout: Duration
    ) -> ProviderCallResult {
        let started = Instant::now();
        match tokio::time::timeout(timeout, entry.adapter.generate(prompt, candidates, timeout)).await
        {
            Ok(result) => result,
            Err(_) => ProviderCallResult::failure(
                entry.adapter.name(),
                ProviderErrorKind::Timeout,
                format!("no answer within {}ms", timeout.as_millis()),
                started.elapsed().as_millis() as u64
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lex_core::{ChatMode, Locale};
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behavior {
        Answer,
        Fail(ProviderErrorKind),
        Hang
    }

    struct StubProvider {
        name: &'static str,
        behavior: Behavior,
        production: bool,
        calls: AtomicUsize
    }

    impl StubProvider {
        fn new(name: &'static str, behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                name,
                behavior,
                production: true,
                calls: AtomicUsize::new(0)
            })
        }
    }

    #[async_trait]
    impl ProviderAdapter for StubProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn is_production(&self) -> bool {
            self.production
        }

        async fn generate(
            &self,
            _prompt: &Prompt,
            _candidates: &[GroundingCandidate],
            _timeout: Duration
        ) -> ProviderCallResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Answer => ProviderCallResult::success(self.name, "answer", vec![], 1),
                Behavior::Fail(kind) => ProviderCallResult::failure(self.name, kind, "stub", 1),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    ProviderCallResult::success(self.name, "too late", vec![], 30_000)
                }
            }
        }
    }

    fn slot(adapter: Arc<StubProvider>, timeout_ms: u64) -> ProviderSlot {
        ProviderSlot {
            adapter,
            timeout: Duration::from_millis(timeout_ms)
        }
    }

    fn router(slots: Vec<ProviderSlot>, threshold: u32) -> ProviderRouter {
        let settings = BreakerSettings {
            failure_threshold: threshold,
            cooldown: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            max_cooldown: Duration::from_secs(300),
            last_resort_probe: false
        };
        ProviderRouter::new(
            slots,
            EnvironmentTier::Local,
            &settings,
            Duration::from_secs(5),
            Arc::new(TelemetryRecorder::new(60, 64).with_metrics(false))
        )
        .unwrap()
    }

    fn prompt() -> Prompt {
        Prompt {
            question: "q".to_string(),
            locale: Locale::En,
            mode: ChatMode::Standard
        }
    }

    #[tokio::test]
    async fn test_first_provider_success_is_not_fallback() {
        let primary = StubProvider::new("primary", Behavior::Answer);
        let secondary = StubProvider::new("secondary", Behavior::Answer);
        let router = router(vec![slot(primary, 100), slot(secondary.clone(), 100)], 3);

        let success = router.route(&prompt(), &[]).await.unwrap();
        assert_eq!(
            success.fallback_used,
            FallbackUsed {
                used: false,
                provider: Some("primary".to_string()),
                reason: None
            }
        );
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_timeout_falls_back_with_specific_reason() {
        let primary = StubProvider::new("primary", Behavior::Hang);
        let secondary = StubProvider::new("secondary", Behavior::Answer);
        let router = router(vec![slot(primary, 50), slot(secondary, 100)], 3);

        let success = router.route(&prompt(), &[]).await.unwrap();
        assert_eq!(success.provider, "secondary");
        assert_eq!(
            success.fallback_used,
            FallbackUsed {
                used: true,
                provider: Some("secondary".to_string()),
                reason: Some(FallbackReason::Timeout)
            }
        );
        assert_eq!(router.breaker("primary").unwrap().consecutive_failures(), 1);
    }

    #[tokio::test]
    async fn test_first_failure_reason_wins() {
        let a = StubProvider::new("a", Behavior::Fail(ProviderErrorKind::RateLimit));
        let b = StubProvider::new("b", Behavior::Fail(ProviderErrorKind::ProviderError));
        let c = StubProvider::new("c", Behavior::Answer);
        let router = router(vec![slot(a, 100), slot(b, 100), slot(c, 100)], 3);

        let success = router.route(&prompt(), &[]).await.unwrap();
        assert_eq!(success.fallback_used.reason, Some(FallbackReason::RateLimit));
        assert_eq!(success.attempts.len(), 3);
    }

    #[tokio::test]
    async fn test_open_breaker_is_skipped_without_calling() {
        let primary = StubProvider::new("primary", Behavior::Fail(ProviderErrorKind::ProviderError));
        let secondary = StubProvider::new("secondary", Behavior::Answer);
        let router = router(vec![slot(primary.clone(), 100), slot(secondary, 100)], 2);

        router.route(&prompt(), &[]).await.unwrap();
        router.route(&prompt(), &[]).await.unwrap();
        assert_eq!(router.breaker("primary").unwrap().state(), BreakerState::Open);
        assert_eq!(primary.calls.load(Ordering::SeqCst), 2);

        let success = router.route(&prompt(), &[]).await.unwrap();
        assert_eq!(primary.calls.load(Ordering::SeqCst), 2);
        assert_eq!(success.fallback_used.reason, Some(FallbackReason::CircuitOpen));
        assert_eq!(success.attempts[0].outcome, AttemptOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_last_reason() {
        let a = StubProvider::new("a", Behavior::Fail(ProviderErrorKind::Timeout));
        let b = StubProvider::new("b", Behavior::Fail(ProviderErrorKind::RateLimit));
        let router = router(vec![slot(a, 100), slot(b, 100)], 3);

        let failure = router.route(&prompt(), &[]).await.unwrap_err();
        assert_eq!(failure.first_reason, FallbackReason::Timeout);
        assert_eq!(failure.last_reason, FallbackReason::RateLimit);
        assert_eq!(failure.attempts.len(), 2);
    }

    #[tokio::test]
    async fn test_hard_ceiling_bounds_the_chain() {
        let a = StubProvider::new("a", Behavior::Hang);
        let b = StubProvider::new("b", Behavior::Hang);
        let settings = BreakerSettings::default();
        let router = ProviderRouter::new(
            vec![slot(a, 10_000), slot(b, 10_000)],
            EnvironmentTier::Local,
            &settings,
            Duration::from_millis(80),
            Arc::new(TelemetryRecorder::new(60, 64).with_metrics(false))
        )
        .unwrap();
        assert_eq!(router.aggregate_budget(), Duration::from_millis(80));

        let started = std::time::Instant::now();
        let failure = router.route(&prompt(), &[]).await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(failure.last_reason, FallbackReason::Timeout);
    }

    #[tokio::test]
    async fn test_hardened_router_drops_non_production() {
        let primary = StubProvider::new("primary", Behavior::Answer);
        let scaffold = Arc::new(StubProvider {
            name: "scaffold",
            behavior: Behavior::Answer,
            production: false,
            calls: AtomicUsize::new(0)
        });
        let router = ProviderRouter::new(
            vec![slot(primary, 100), slot(scaffold.clone(), 100)],
            EnvironmentTier::Production,
            &BreakerSettings::default(),
            Duration::from_secs(1),
            Arc::new(TelemetryRecorder::default().with_metrics(false))
        )
        .unwrap();
        assert_eq!(router.provider_names(), vec!["primary"]);

        let only_scaffold = ProviderRouter::new(
            vec![slot(scaffold, 100)],
            EnvironmentTier::Ci,
            &BreakerSettings::default(),
            Duration::from_secs(1),
            Arc::new(TelemetryRecorder::default().with_metrics(false))
        );
        assert!(matches!(
            only_scaffold,
            Err(ConfigError::EmptyProviderChain { .. })
        ));
    }

    #[tokio::test]
    async fn test_provider_counters_recorded() {
        let primary = StubProvider::new("primary", Behavior::Fail(ProviderErrorKind::Timeout));
        let secondary = StubProvider::new("secondary", Behavior::Answer);
        let telemetry = Arc::new(TelemetryRecorder::new(60, 64).with_metrics(false));
        let router = ProviderRouter::new(
            vec![slot(primary, 100), slot(secondary, 100)],
            EnvironmentTier::Local,
            &BreakerSettings::default(),
            Duration::from_secs(1),
            telemetry.clone()
        )
        .unwrap();

        router.route(&prompt(), &[]).await.unwrap();
        let snap = telemetry.snapshot();
        assert_eq!(snap.providers["primary"].failure, 1);
        assert_eq!(snap.providers["primary"].timeouts, 1);
        assert_eq!(snap.providers["secondary"].fallback_success, 1);
    }
}
