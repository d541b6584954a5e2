use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use adapters::ProviderSlot;
use async_trait::async_trait;
use errors::{GroundingError, StorageError};
use lex_core::{
    CounterStore, GroundingCandidate, GroundingRetriever, Locale, Prompt, ProposedCitation,
    ProviderAdapter, ProviderCallResult, ProviderErrorKind, SourceTrust
};
use parking_lot::Mutex;

/// One scripted provider reaction.
#[derive(Debug, Clone)]
pub enum Step {
    Answer {
        answer: String,
        citations: Vec<ProposedCitation>
    },
    Fail(ProviderErrorKind),
    /// Never answers; the router's timeout has to cut it off.
    Hang,
    /// Waits, then plays the inner step.
    Slow { delay: Duration, then: Box<Step> }
}

impl Step {
    pub fn answer(answer: impl Into<String>, citations: Vec<ProposedCitation>) -> Self {
        Self::Answer {
            answer: answer.into(),
            citations
        }
    }

    pub fn slow(delay: Duration, then: Step) -> Self {
        Self::Slow {
            delay,
            then: Box::new(then)
        }
    }
}

/// Provider adapter that replays scripted steps, then repeats a default
/// step. Counts every call.
pub struct ScriptedProvider {
    name: String,
    production: bool,
    script: Mutex<VecDeque<Step>>,
    default_step: Step,
    delay: Duration,
    calls: AtomicUsize
}

impl ScriptedProvider {
    pub fn new(name: impl Into<String>, default_step: Step) -> Self {
        Self {
            name: name.into(),
            production: true,
            script: Mutex::new(VecDeque::new()),
            default_step,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0)
        }
    }

    pub fn answering(
        name: impl Into<String>,
        answer: impl Into<String>,
        citations: Vec<ProposedCitation>
    ) -> Self {
        Self::new(name, Step::answer(answer, citations))
    }

    pub fn failing(name: impl Into<String>, kind: ProviderErrorKind) -> Self {
        Self::new(name, Step::Fail(kind))
    }

    pub fn hanging(name: impl Into<String>) -> Self {
        Self::new(name, Step::Hang)
    }

    /// Steps played in order before the default step takes over.
    pub fn with_script(self, steps: Vec<Step>) -> Self {
        *self.script.lock() = steps.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn non_production(mut self) -> Self {
        self.production = false;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> Step {
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.default_step.clone())
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
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
        let mut step = self.next_step();
        let mut waited = self.delay;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        while let Step::Slow { delay, then } = step {
            tokio::time::sleep(delay).await;
            waited += delay;
            step = *then;
        }
        let latency_ms = waited.as_millis() as u64;

        match step {
            Step::Answer { answer, citations } => {
                ProviderCallResult::success(&self.name, answer, citations, latency_ms)
            }
            Step::Fail(kind) => {
                ProviderCallResult::failure(&self.name, kind, "scripted failure", latency_ms)
            }
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                ProviderCallResult::failure(
                    &self.name,
                    ProviderErrorKind::Timeout,
                    "scripted hang",
                    latency_ms
                )
            }
            Step::Slow { .. } => ProviderCallResult::failure(
                &self.name,
                ProviderErrorKind::ProviderError,
                "unresolved slow step",
                latency_ms
            )
        }
    }
}

pub fn slot(adapter: Arc<ScriptedProvider>, timeout: Duration) -> ProviderSlot {
    ProviderSlot { adapter, timeout }
}

/// Grounding retriever that returns the same candidates for every query.
pub struct FixedGrounding {
    candidates: Vec<GroundingCandidate>,
    calls: AtomicUsize
}

impl FixedGrounding {
    pub fn new(candidates: Vec<GroundingCandidate>) -> Self {
        Self {
            candidates,
            calls: AtomicUsize::new(0)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GroundingRetriever for FixedGrounding {
    async fn retrieve(
        &self,
        _query: &str,
        _locale: Locale,
        k: usize
    ) -> Result<Vec<GroundingCandidate>, GroundingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.candidates.iter().take(k).cloned().collect())
    }
}

/// Grounding retriever that always fails with the given error.
pub struct FailingGrounding {
    error: GroundingError
}

impl FailingGrounding {
    pub fn new(error: GroundingError) -> Self {
        Self { error }
    }

    pub fn unavailable() -> Self {
        Self::new(GroundingError::Unavailable {
            reason: "retrieval index offline".to_string()
        })
    }
}

#[async_trait]
impl GroundingRetriever for FailingGrounding {
    async fn retrieve(
        &self,
        _query: &str,
        _locale: Locale,
        _k: usize
    ) -> Result<Vec<GroundingCandidate>, GroundingError> {
        Err(self.error.clone())
    }
}

/// Counter store whose every increment fails, like an unreachable Redis.
#[derive(Default)]
pub struct FailingCounterStore {
    attempts: AtomicUsize
}

impl FailingCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CounterStore for FailingCounterStore {
    fn backend(&self) -> &'static str {
        "Redis"
    }

    async fn increment(&self, _key: &str, _ttl: Duration) -> Result<u64, StorageError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::ConnectionError {
            backend: "Redis".to_string(),
            reason: "connection refused".to_string()
        })
    }
}

pub fn fedlex_candidate() -> GroundingCandidate {
    GroundingCandidate {
        source_id: "fedlex".to_string(),
        title: "Swiss Code of Obligations".to_string(),
        url: Some("https://www.fedlex.admin.ch/eli/cc/27/317_321_377/en".to_string()),
        pin: Some("Art. 335c".to_string()),
        snippet: "The employment relationship may be terminated by either party with one \
                  month's notice in the first year of service."
            .to_string(),
        trust: SourceTrust::Official
    }
}

pub fn bger_candidate() -> GroundingCandidate {
    GroundingCandidate {
        source_id: "bger".to_string(),
        title: "Federal Supreme Court 4A_558/2022".to_string(),
        url: Some("https://www.bger.ch/ext/eurospider/live/de/php/aza/http/index.php".to_string()),
        pin: Some("E. 3.1".to_string()),
        snippet: "Notice periods run to the end of a calendar month.".to_string(),
        trust: SourceTrust::Official
    }
}

pub fn cite(candidate: &GroundingCandidate) -> ProposedCitation {
    ProposedCitation {
        source_id: candidate.source_id.clone(),
        pin: candidate.pin.clone(),
        url: None
    }
}

pub fn grounded_answer() -> &'static str {
    "In the first year of service the notice period is one month (Art. 335c CO)."
}
