//! Policy compliance: the pre-generation refusal screen and the
//! post-generation citation enforcement.

pub mod citations;
pub mod messages;
pub mod refusal;
pub mod trust;

use config::Config;
use errors::ConfigError;
use lex_core::{
    Citation, ConfidenceTier, EnvironmentTier, GroundingCandidate, PolicyDecision, PolicyReason,
    ProposedCitation
};

pub use refusal::RefusalScreen;
pub use trust::{SourceTrustPolicy, host_of};

/// Result of post-generation enforcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationOutcome {
    pub decision: PolicyDecision,
    pub citations: Vec<Citation>,
    pub confidence: ConfidenceTier,
    pub synthetic: bool
}

pub struct PolicyComplianceEngine {
    screen: RefusalScreen,
    trust: SourceTrustPolicy,
    environment: EnvironmentTier,
    synthetic_citations_enabled: bool
}

impl PolicyComplianceEngine {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            screen: RefusalScreen::new(&config.policy.extra_refusal_patterns)?,
            trust: SourceTrustPolicy::from_config(&config.policy.trusted_sources),
            environment: config.environment,
            synthetic_citations_enabled: config.policy.synthetic_citations_enabled
        })
    }

    pub fn trust(&self) -> &SourceTrustPolicy {
        &self.trust
    }

    pub fn synthetic_allowed(&self) -> bool {
        self.synthetic_citations_enabled && !self.environment.is_hardened()
    }

    pub fn precheck(&self, message: &str) -> PolicyDecision {
        self.screen.screen(message)
    }

    pub fn postcheck(
        &self,
        proposed: &[ProposedCitation],
        candidates: &[GroundingCandidate]
    ) -> CitationOutcome {
        let citations = citations::enforce(&self.trust, proposed, candidates);
        if !citations.is_empty() {
            return CitationOutcome {
                decision: PolicyDecision::allow(),
                confidence: citations::confidence(&self.trust, &citations),
                citations,
                synthetic: false
            };
        }

        if self.synthetic_allowed() {
            return CitationOutcome {
                decision: PolicyDecision::allow(),
                citations: citations::synthetic(candidates),
                confidence: ConfidenceTier::Low,
                synthetic: true
            };
        }

        CitationOutcome {
            decision: PolicyDecision::refuse(PolicyReason::NoGroundedCitation),
            citations: Vec::new(),
            confidence: ConfidenceTier::Low,
            synthetic: false
        }
    }
}
