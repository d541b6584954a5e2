use std::collections::HashSet;

use lex_core::{Citation, ConfidenceTier, GroundingCandidate, ProposedCitation, SourceTrust};
use tracing::debug;

use super::trust::SourceTrustPolicy;

const SYNTHETIC_CITATION_LIMIT: usize = 3;

fn normalize_pin(pin: &str) -> String {
    pin.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn pins_match(proposed: Option<&str>, candidate: Option<&str>) -> bool {
    match (proposed, candidate) {
        (Some(a), Some(b)) => normalize_pin(a) == normalize_pin(b),
        _ => true
    }
}

fn find_candidate<'a>(
    proposed: &ProposedCitation,
    candidates: &'a [GroundingCandidate]
) -> Option<&'a GroundingCandidate> {
    candidates.iter().find(|candidate| {
        candidate.source_id == proposed.source_id
            && pins_match(proposed.pin.as_deref(), candidate.pin.as_deref())
    })
}

/// Keeps only the proposed citations that are allow-listed, point at a
/// trusted host and match a retrieved candidate. Output fields come from
/// the candidate.
pub fn enforce(
    trust: &SourceTrustPolicy,
    proposed: &[ProposedCitation],
    candidates: &[GroundingCandidate]
) -> Vec<Citation> {
    let mut seen = HashSet::new();
    let mut kept = Vec::new();

    for citation in proposed {
        if !trust.citation_allowed(&citation.source_id) {
            debug!(source_id = %citation.source_id, "Dropping citation: source not allow-listed");
            continue;
        }
        let Some(candidate) = find_candidate(citation, candidates) else {
            debug!(source_id = %citation.source_id, "Dropping citation: no matching grounding candidate");
            continue;
        };

        let urls = [citation.url.as_deref(), candidate.url.as_deref()];
        if urls
            .into_iter()
            .flatten()
            .any(|url| !trust.url_allowed(&citation.source_id, url))
        {
            debug!(source_id = %citation.source_id, "Dropping citation: untrusted URL");
            continue;
        }

        let key = (
            candidate.source_id.clone(),
            candidate.pin.as_deref().map(normalize_pin)
        );
        if seen.insert(key) {
            kept.push(Citation::from(candidate));
        }
    }

    kept
}

pub fn confidence(trust: &SourceTrustPolicy, citations: &[Citation]) -> ConfidenceTier {
    let all_official = citations
        .iter()
        .all(|c| trust.trust_of(&c.source_id) == SourceTrust::Official);
    match citations.len() {
        0 => ConfidenceTier::Low,
        n if n >= 2 && all_official => ConfidenceTier::High,
        _ => ConfidenceTier::Medium
    }
}

/// Development-only stand-ins for when nothing survives enforcement.
pub fn synthetic(candidates: &[GroundingCandidate]) -> Vec<Citation> {
    if candidates.is_empty() {
        return vec![Citation {
            source_id: "scaffold".to_string(),
            title: "Synthetic scaffold citation".to_string(),
            url: None,
            pin: None,
            snippet: "No grounded source was available. This citation is a development \
                      placeholder."
                .to_string()
        }];
    }
    candidates
        .iter()
        .take(SYNTHETIC_CITATION_LIMIT)
        .map(Citation::from)
        .collect()
}
