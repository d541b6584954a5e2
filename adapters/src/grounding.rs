//! Grounding retrievers: the HTTP boundary to the retrieval index, and a
//! small built-in corpus for offline development.

use async_trait::async_trait;
use errors::GroundingError;
use lex_core::{GroundingCandidate, GroundingRetriever, Locale, SourceTrust};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub struct HttpGroundingClient {
    client: Client,
    base_url: String,
    timeout: Duration
}

#[derive(Debug, Serialize)]
struct RetrieveRequest<'a> {
    query: &'a str,
    k: usize,
    locale: Locale
}

#[derive(Debug, Deserialize)]
struct RetrieveResponse {
    candidates: Vec<GroundingCandidate>
}

impl HttpGroundingClient {
    pub fn new(client: Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout
        }
    }
}

#[async_trait]
impl GroundingRetriever for HttpGroundingClient {
    async fn retrieve(
        &self,
        query: &str,
        locale: Locale,
        k: usize
    ) -> Result<Vec<GroundingCandidate>, GroundingError> {
        let timeout_ms = self.timeout.as_millis() as u64;
        let map_transport = |e: reqwest::Error| {
            if e.is_timeout() {
                GroundingError::Timeout { timeout_ms }
            } else {
                GroundingError::Unavailable {
                    reason: e.to_string()
                }
            }
        };

        let response = self
            .client
            .post(format!("{}/v1/retrieve", self.base_url))
            .timeout(self.timeout)
            .json(&RetrieveRequest { query, k, locale })
            .send()
            .await
            .map_err(map_transport)?;

        if !response.status().is_success() {
            return Err(GroundingError::Unavailable {
                reason: format!("retrieval service returned HTTP {}", response.status())
            });
        }

        let body = response.bytes().await.map_err(map_transport)?;
        let parsed: RetrieveResponse =
            serde_json::from_slice(&body).map_err(|e| GroundingError::InvalidResponse {
                reason: e.to_string()
            })?;

        let mut candidates = parsed.candidates;
        candidates.truncate(k);
        tracing::debug!(count = candidates.len(), "Retrieved grounding candidates");
        Ok(candidates)
    }
}

/// In-memory corpus matched by keyword overlap. Scaffold grounding for local
/// and development tiers only.
#[derive(Debug, Clone, Default)]
pub struct StaticGrounding {
    corpus: Vec<GroundingCandidate>
}

impl StaticGrounding {
    pub fn new(corpus: Vec<GroundingCandidate>) -> Self {
        Self { corpus }
    }

    pub fn builtin() -> Self {
        Self::new(builtin_corpus())
    }

    pub fn len(&self) -> usize {
        self.corpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corpus.is_empty()
    }

    fn score(candidate: &GroundingCandidate, terms: &[String]) -> usize {
        let haystack = format!("{} {}", candidate.title, candidate.snippet).to_lowercase();
        terms.iter().filter(|t| haystack.contains(t.as_str())).count()
    }
}

#[async_trait]
impl GroundingRetriever for StaticGrounding {
    async fn retrieve(
        &self,
        query: &str,
        _locale: Locale,
        k: usize
    ) -> Result<Vec<GroundingCandidate>, GroundingError> {
        let terms: Vec<String> = query
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.chars().count() >= 4)
            .map(str::to_lowercase)
            .collect();

        let mut scored: Vec<(usize, &GroundingCandidate)> = self
            .corpus
            .iter()
            .map(|c| (Self::score(c, &terms), c))
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored.into_iter().take(k).map(|(_, c)| c.clone()).collect())
    }
}

fn entry(
    source_id: &str,
    title: &str,
    url: &str,
    pin: &str,
    snippet: &str,
    trust: SourceTrust
) -> GroundingCandidate {
    GroundingCandidate {
        source_id: source_id.to_string(),
        title: title.to_string(),
        url: Some(url.to_string()),
        pin: Some(pin.to_string()),
        snippet: snippet.to_string(),
        trust
    }
}

fn builtin_corpus() -> Vec<GroundingCandidate> {
    vec![
        entry(
            "fedlex",
            "Code of Obligations, Art. 335c (notice periods)",
            "https://www.fedlex.admin.ch/eli/cc/27/317_321_377/en#art_335_c",
            "CO 335c",
            "After the probation period, an employment relationship may be terminated with one \
             month's notice in the first year of service, two months' notice in the second to \
             ninth year and three months' notice thereafter. Kündigung Kündigungsfrist résiliation \
             disdetta.",
            SourceTrust::Official
        ),
        entry(
            "fedlex",
            "Code of Obligations, Art. 259a (defects in rented property)",
            "https://www.fedlex.admin.ch/eli/cc/27/317_321_377/en#art_259_a",
            "CO 259a",
            "Where defects arise in the rented property that are not attributable to the tenant, \
             the tenant may require the landlord to remedy the defect, reduce the rent, or pay \
             damages. Mietmangel Mietzins défaut loyer difetto pigione.",
            SourceTrust::Official
        ),
        entry(
            "fedlex",
            "Civil Code, Art. 2 (good faith)",
            "https://www.fedlex.admin.ch/eli/cc/24/233_245_233/en#art_2",
            "CC 2",
            "Every person must act in good faith in the exercise of their rights and in the \
             performance of their obligations. Treu Glauben bonne foi buona fede.",
            SourceTrust::Official
        ),
        entry(
            "fedlex",
            "Federal Constitution, Art. 8 (equality before the law)",
            "https://www.fedlex.admin.ch/eli/cc/1999/404/en#art_8",
            "Cst. 8",
            "Every person is equal before the law. No person may be discriminated against. \
             Rechtsgleichheit Diskriminierung égalité discrimination uguaglianza.",
            SourceTrust::Official
        ),
        entry(
            "bger",
            "Federal Supreme Court, BGE 136 III 513 (notice during illness)",
            "https://www.bger.ch/ext/eurospider/live/de/php/clir/http/index.php?highlight_docid=atf://136-III-513",
            "BGE 136 III 513",
            "Termination notice given during a protected period of incapacity for work is void; \
             the notice period is suspended during illness. Kündigung Krankheit employment \
             termination illness.",
            SourceTrust::Official
        ),
    ]
}
