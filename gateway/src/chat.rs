//! The chat-turn orchestrator: refusal screen, grounding retrieval, routed
//! generation and citation enforcement, with exactly one telemetry outcome
//! per request.

use std::sync::Arc;
use std::time::{Duration, Instant};

use config::Config;
use errors::GroundingError;
use lex_core::{
    ChatRequest, ChatResponse, ConfidenceTier, FallbackReason, FallbackUsed, GroundingCandidate,
    GroundingRetriever, Locale, PolicyReason, PolicyVerdict, Prompt
};
use observability::{OutcomeKind, RequestOutcome, TelemetryRecorder};
use tracing::{debug, error, info, warn};

use crate::errors::{GatewayError, GatewayResult};
use crate::policy::{PolicyComplianceEngine, messages};
use crate::router::ProviderRouter;

const MAX_SESSION_ID_CHARS: usize = 128;

#[derive(Debug, Clone, Copy)]
pub struct ChatSettings {
    pub max_message_chars: usize,
    pub grounding_required: bool,
    pub grounding_timeout: Duration,
    pub top_k: usize
}

impl ChatSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_message_chars: config.policy.max_message_chars,
            grounding_required: config.grounding.is_required(config.environment),
            grounding_timeout: Duration::from_millis(config.grounding.timeout_ms),
            top_k: config.grounding.top_k
        }
    }
}

struct Turn {
    response: ChatResponse,
    kind: OutcomeKind
}

pub struct ChatService {
    policy: Arc<PolicyComplianceEngine>,
    router: Arc<ProviderRouter>,
    grounding: Arc<dyn GroundingRetriever>,
    telemetry: Arc<TelemetryRecorder>,
    settings: ChatSettings
}

fn valid_session_id(session_id: &str) -> bool {
    !session_id.is_empty()
        && session_id.chars().count() <= MAX_SESSION_ID_CHARS
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-'))
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

impl ChatService {
    pub fn new(
        policy: Arc<PolicyComplianceEngine>,
        router: Arc<ProviderRouter>,
        grounding: Arc<dyn GroundingRetriever>,
        telemetry: Arc<TelemetryRecorder>,
        settings: ChatSettings
    ) -> Self {
        Self {
            policy,
            router,
            grounding,
            telemetry,
            settings
        }
    }

    pub fn validate(&self, request: &ChatRequest) -> GatewayResult<()> {
        if !valid_session_id(&request.session_id) {
            return Err(GatewayError::validation(
                "session_id must be 1-128 characters of letters, digits, '_', '.', ':' or '-'"
            ));
        }
        let message = request.message.trim();
        if message.is_empty() {
            return Err(GatewayError::validation("message must not be empty"));
        }
        if message.chars().count() > self.settings.max_message_chars {
            return Err(GatewayError::validation(format!(
                "message exceeds {} characters",
                self.settings.max_message_chars
            )));
        }
        Ok(())
    }

    /// Runs one chat turn to a terminal state.
    pub async fn handle(&self, request: ChatRequest) -> GatewayResult<ChatResponse> {
        let started = Instant::now();
        let result = self.run(&request).await;

        match &result {
            Ok(turn) => {
                self.telemetry.record_outcome(&RequestOutcome {
                    kind: turn.kind,
                    latency_ms: elapsed_ms(started),
                    fallback_used: turn.response.fallback_used.used
                });
                info!(
                    outcome = turn.kind.as_str(),
                    citations = turn.response.citations.len(),
                    confidence = turn.response.confidence.as_ref(),
                    "Chat turn completed"
                );
            }
            Err(e) => self.record_rejection(e, started)
        }

        result.map(|turn| turn.response)
    }

    /// Records a request that ended in an error before or outside `handle`.
    pub fn record_rejection(&self, error: &GatewayError, started: Instant) {
        self.telemetry.record_outcome(&RequestOutcome {
            kind: OutcomeKind::Error(error.code().as_str()),
            latency_ms: elapsed_ms(started),
            fallback_used: false
        });
        info!(code = error.code().as_str(), error = %error, "Chat turn failed");
    }

    async fn run(&self, request: &ChatRequest) -> GatewayResult<Turn> {
        self.validate(request)?;
        let message = request.message.trim();

        let decision = self.policy.precheck(message);
        match (decision.verdict, decision.reason) {
            (PolicyVerdict::Block, reason) => {
                let reason = reason.unwrap_or(PolicyReason::PromptInjection);
                warn!(reason = reason.as_ref(), "Request blocked by policy");
                return Err(GatewayError::PolicyBlocked { reason });
            }
            (PolicyVerdict::Refuse, Some(reason)) => {
                info!(reason = reason.as_ref(), "Request refused before generation");
                return Ok(Turn {
                    response: refusal(request.locale, reason),
                    kind: OutcomeKind::Refused
                });
            }
            _ => {}
        }

        let candidates = self.retrieve(message, request.locale).await?;
        let prompt = Prompt::from_request(request);

        let routed = self
            .router
            .route(&prompt, &candidates)
            .await
            .map_err(|failure| GatewayError::ProviderExhausted {
                reason: failure.last_reason
            })?;

        let outcome = self.policy.postcheck(&routed.citations, &candidates);
        if !outcome.decision.is_allowed() {
            info!(
                provider = %routed.provider,
                "No proposed citation survived enforcement, returning safe response"
            );
            return Ok(Turn {
                response: ChatResponse {
                    answer: messages::no_grounded_answer(request.locale).to_string(),
                    citations: Vec::new(),
                    confidence: ConfidenceTier::Low,
                    disclaimer: messages::disclaimer(request.locale).to_string(),
                    fallback_used: FallbackUsed {
                        used: routed.fallback_used.used,
                        provider: routed.fallback_used.provider,
                        reason: Some(FallbackReason::PolicyBlock)
                    }
                },
                kind: OutcomeKind::Refused
            });
        }

        let fallback_used = if outcome.synthetic {
            warn!(provider = %routed.provider, "Substituting synthetic citations");
            FallbackUsed {
                used: routed.fallback_used.used,
                provider: routed.fallback_used.provider,
                reason: Some(FallbackReason::SyntheticGrounding)
            }
        } else {
            routed.fallback_used
        };

        Ok(Turn {
            response: ChatResponse {
                answer: routed.answer,
                citations: outcome.citations,
                confidence: outcome.confidence,
                disclaimer: messages::disclaimer(request.locale).to_string(),
                fallback_used
            },
            kind: OutcomeKind::Answered
        })
    }

    async fn retrieve(&self, query: &str, locale: Locale) -> GatewayResult<Vec<GroundingCandidate>> {
        let timeout = self.settings.grounding_timeout;
        let result = tokio::time::timeout(
            timeout,
            self.grounding.retrieve(query, locale, self.settings.top_k)
        )
        .await
        .unwrap_or_else(|_| {
            Err(GroundingError::Timeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
            })
        });

        match result {
            Ok(candidates) if !candidates.is_empty() => {
                debug!(candidates = candidates.len(), "Grounding retrieved");
                Ok(candidates)
            }
            Ok(_) if self.settings.grounding_required => {
                error!("Grounding returned no candidates and grounding is required");
                Err(GatewayError::SourceUnavailable {
                    reason: "no grounding candidates".to_string()
                })
            }
            Ok(_) => {
                info!("Grounding returned no candidates");
                Ok(Vec::new())
            }
            Err(e) if self.settings.grounding_required => {
                error!(error = %e, "Grounding unavailable and grounding is required");
                Err(GatewayError::SourceUnavailable {
                    reason: e.to_string()
                })
            }
            Err(e) => {
                warn!(error = %e, "Grounding unavailable, continuing without candidates");
                Ok(Vec::new())
            }
        }
    }
}

fn refusal(locale: Locale, reason: PolicyReason) -> ChatResponse {
    ChatResponse {
        answer: messages::refusal(locale, reason).to_string(),
        citations: Vec::new(),
        confidence: ConfidenceTier::Low,
        disclaimer: messages::disclaimer(locale).to_string(),
        fallback_used: FallbackUsed::policy_block()
    }
}
