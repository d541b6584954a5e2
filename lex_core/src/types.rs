use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Deployment tier. `ci`, `staging` and `production` are hardened: they
/// forbid synthetic grounding and fail closed when grounding is missing.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EnvironmentTier {
    #[default]
    Local,
    Development,
    Ci,
    Staging,
    Production
}

impl EnvironmentTier {
    #[must_use]
    pub fn is_hardened(self) -> bool {
        matches!(self, Self::Ci | Self::Staging | Self::Production)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Locale {
    #[default]
    En,
    De,
    Fr,
    It
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChatMode {
    #[default]
    Standard,
    PlainLanguage
}

/// Inbound chat turn. Created per call and dropped after the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
    #[serde(default)]
    pub locale: Locale,
    #[serde(default)]
    pub mode: ChatMode
}

/// Trust classification of a grounding source.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SourceTrust {
    Official,
    Secondary,
    #[default]
    Unverified
}

/// A retrieved, citation-eligible passage offered to providers as context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingCandidate {
    pub source_id: String,
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub pin: Option<String>,
    pub snippet: String,
    #[serde(default)]
    pub trust: SourceTrust
}

/// A citation as proposed by a provider, before trust enforcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedCitation {
    pub source_id: String,
    #[serde(default)]
    pub pin: Option<String>,
    #[serde(default)]
    pub url: Option<String>
}

/// A citation that survived trust enforcement, as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub source_id: String,
    pub title: String,
    pub url: Option<String>,
    pub pin: Option<String>,
    pub snippet: String
}

impl From<&GroundingCandidate> for Citation {
    fn from(candidate: &GroundingCandidate) -> Self {
        Self {
            source_id: candidate.source_id.clone(),
            title: candidate.title.clone(),
            url: candidate.url.clone(),
            pin: candidate.pin.clone(),
            snippet: candidate.snippet.clone()
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProviderErrorKind {
    Timeout,
    RateLimit,
    ProviderError
}

/// Question handed to a provider adapter. Adapters render it together with
/// the grounding candidates into their own wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub question: String,
    pub locale: Locale,
    pub mode: ChatMode
}

impl Prompt {
    pub fn from_request(request: &ChatRequest) -> Self {
        Self {
            question: request.message.trim().to_string(),
            locale: request.locale,
            mode: request.mode
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderOutcome {
    Success {
        answer: String,
        citations: Vec<ProposedCitation>
    },
    Failure {
        kind: ProviderErrorKind,
        detail: String
    }
}

/// Tagged result of one provider attempt. Adapters convert every transport
/// or SDK failure into `ProviderOutcome::Failure` at their boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCallResult {
    pub provider: String,
    pub outcome: ProviderOutcome,
    pub latency_ms: u64
}

impl ProviderCallResult {
    pub fn success(
        provider: impl Into<String>,
        answer: impl Into<String>,
        citations: Vec<ProposedCitation>,
        latency_ms: u64
    ) -> Self {
        Self {
            provider: provider.into(),
            outcome: ProviderOutcome::Success {
                answer: answer.into(),
                citations
            },
            latency_ms
        }
    }

    pub fn failure(
        provider: impl Into<String>,
        kind: ProviderErrorKind,
        detail: impl Into<String>,
        latency_ms: u64
    ) -> Self {
        Self {
            provider: provider.into(),
            outcome: ProviderOutcome::Failure {
                kind,
                detail: detail.into()
            },
            latency_ms
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ProviderOutcome::Success { .. })
    }

    #[must_use]
    pub fn error_kind(&self) -> Option<ProviderErrorKind> {
        match &self.outcome {
            ProviderOutcome::Failure { kind, .. } => Some(*kind),
            ProviderOutcome::Success { .. } => None
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low
}

/// Why the answer did not come from the first provider in the chain, or why
/// no provider answer was returned at all.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FallbackReason {
    Timeout,
    RateLimit,
    ProviderError,
    CircuitOpen,
    PolicyBlock,
    SyntheticGrounding
}

impl From<ProviderErrorKind> for FallbackReason {
    fn from(kind: ProviderErrorKind) -> Self {
        match kind {
            ProviderErrorKind::Timeout => Self::Timeout,
            ProviderErrorKind::RateLimit => Self::RateLimit,
            ProviderErrorKind::ProviderError => Self::ProviderError
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackUsed {
    pub used: bool,
    pub provider: Option<String>,
    pub reason: Option<FallbackReason>
}

impl FallbackUsed {
    #[must_use]
    pub fn policy_block() -> Self {
        Self {
            used: false,
            provider: None,
            reason: Some(FallbackReason::PolicyBlock)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub confidence: ConfidenceTier,
    pub disclaimer: String,
    pub fallback_used: FallbackUsed
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PolicyVerdict {
    Allow,
    Refuse,
    Block
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PolicyReason {
    PersonalizedRepresentation,
    FilingAction,
    CaseStrategy,
    PromptInjection,
    NoGroundedCitation
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub verdict: PolicyVerdict,
    pub reason: Option<PolicyReason>
}

impl PolicyDecision {
    #[must_use]
    pub fn allow() -> Self {
        Self {
            verdict: PolicyVerdict::Allow,
            reason: None
        }
    }

    #[must_use]
    pub fn refuse(reason: PolicyReason) -> Self {
        Self {
            verdict: PolicyVerdict::Refuse,
            reason: Some(reason)
        }
    }

    #[must_use]
    pub fn block(reason: PolicyReason) -> Self {
        Self {
            verdict: PolicyVerdict::Block,
            reason: Some(reason)
        }
    }

    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.verdict == PolicyVerdict::Allow
    }
}
