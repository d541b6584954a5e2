use async_trait::async_trait;
use lex_core::{GroundingCandidate, Locale, Prompt, ProposedCitation, ProviderAdapter, ProviderCallResult};
use std::time::Duration;

/// Deterministic offline provider for local development.
///
/// Summarizes the top grounding candidate and cites it. Never part of a
/// hardened provider chain.
pub struct ScaffoldAdapter {
    name: String
}

impl ScaffoldAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

fn lead_in(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "According to",
        Locale::De => "Gemäss",
        Locale::Fr => "Selon",
        Locale::It => "Secondo"
    }
}

fn nothing_found(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "No source covering this question was found.",
        Locale::De => "Zu dieser Frage wurde keine Quelle gefunden.",
        Locale::Fr => "Aucune source ne couvre cette question.",
        Locale::It => "Nessuna fonte copre questa domanda."
    }
}

#[async_trait]
impl ProviderAdapter for ScaffoldAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_production(&self) -> bool {
        false
    }

    async fn generate(
        &self,
        prompt: &Prompt,
        candidates: &[GroundingCandidate],
        _timeout: Duration
    ) -> ProviderCallResult {
        let Some(top) = candidates.first() else {
            return ProviderCallResult::success(&self.name, nothing_found(prompt.locale), Vec::new(), 0);
        };

        let answer = format!("{} {}: {}", lead_in(prompt.locale), top.title, top.snippet);
        let citation = ProposedCitation {
            source_id: top.source_id.clone(),
            pin: top.pin.clone(),
            url: top.url.clone()
        };
        ProviderCallResult::success(&self.name, answer, vec![citation], 0)
    }
}
