//! Shared prompt rendering and answer parsing for the HTTP adapters.
//!
//! Providers receive the numbered grounding passages and are asked to return
//! `{"answer": "...", "citations": [{"source_id": "...", "pin": "..."}]}`.

use lex_core::{ChatMode, GroundingCandidate, Locale, Prompt, ProposedCitation};
use serde::Deserialize;
use std::fmt::Write;

const MAX_SNIPPET_CHARS: usize = 1200;

pub fn language_name(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "English",
        Locale::De => "German",
        Locale::Fr => "French",
        Locale::It => "Italian"
    }
}

pub fn render_system(prompt: &Prompt) -> String {
    let mut system = String::from(
        "You provide general legal information about Swiss law. You are not a lawyer and you \
         never give personalized legal advice, draft filings, or plan litigation strategy.\n\
         Base every statement only on the numbered sources in the user message. Cite each \
         source you rely on by its source_id and, where applicable, its pin. If the sources do \
         not answer the question, say so and return no citations.\n\
         Respond with a single JSON object and nothing else: \
         {\"answer\": string, \"citations\": [{\"source_id\": string, \"pin\": string|null}]}.\n"
    );
    let _ = write!(system, "Write the answer in {}.", language_name(prompt.locale));
    if prompt.mode == ChatMode::PlainLanguage {
        system.push_str(
            " Use plain language: short sentences, everyday words, and explain any legal term \
             you must use."
        );
    }
    system
}

pub fn render_user(prompt: &Prompt, candidates: &[GroundingCandidate]) -> String {
    let mut user = String::new();
    if candidates.is_empty() {
        user.push_str("Sources: none available.\n\n");
    } else {
        user.push_str("Sources:\n");
        for (i, candidate) in candidates.iter().enumerate() {
            let _ = writeln!(
                user,
                "[{}] source_id={} pin={} trust={}\nTitle: {}\n{}\n",
                i + 1,
                candidate.source_id,
                candidate.pin.as_deref().unwrap_or("-"),
                candidate.trust,
                candidate.title,
                truncate(&candidate.snippet, MAX_SNIPPET_CHARS)
            );
        }
    }
    let _ = write!(user, "Question: {}", prompt.question);
    user
}

#[derive(Debug, Deserialize)]
struct RawAnswer {
    answer: String,
    #[serde(default)]
    citations: Vec<ProposedCitation>
}

/// Parses a provider's raw text into an answer and its proposed citations.
/// Markdown code fences and leading/trailing prose around the JSON object are
/// tolerated.
pub fn parse_answer(raw: &str) -> Result<(String, Vec<ProposedCitation>), String> {
    let body = extract_json_object(raw).ok_or_else(|| "no JSON object in output".to_string())?;
    let parsed: RawAnswer =
        serde_json::from_str(body).map_err(|e| format!("malformed answer JSON: {e}"))?;

    let answer = parsed.answer.trim();
    if answer.is_empty() {
        return Err("empty answer".to_string());
    }
    Ok((answer.to_string(), parsed.citations))
}

fn extract_json_object(raw: &str) -> Option<&str> {
    let trimmed = strip_code_fence(raw.trim());
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (end > start).then(|| &trimmed[start..=end])
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.find('\n').map_or(rest, |nl| &rest[nl + 1..]);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text
    }
}
