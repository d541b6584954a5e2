use crate::http::{elapsed_ms, parse_failure, status_failure, transport_failure};
use crate::prompt::{parse_answer, render_system, render_user};
use async_trait::async_trait;
use lex_core::{GroundingCandidate, Prompt, ProviderAdapter, ProviderCallResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Adapter for the Anthropic Messages API.
pub struct AnthropicAdapter {
    name: String,
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [UserMessage<'a>; 1],
    temperature: f32
}

#[derive(Debug, Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>
}

impl AnthropicAdapter {
    pub fn new(
        name: impl Into<String>,
        client: Client,
        base_url: &str,
        model: impl Into<String>,
        api_key: Option<String>,
        max_tokens: u32
    ) -> Self {
        Self {
            name: name.into(),
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            max_tokens
        }
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        prompt: &Prompt,
        candidates: &[GroundingCandidate],
        timeout: Duration
    ) -> ProviderCallResult {
        let start = Instant::now();
        let system = render_system(prompt);
        let user = render_user(prompt, candidates);

        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: &system,
            messages: [UserMessage {
                role: "user",
                content: &user
            }],
            temperature: 0.0
        };

        let mut request = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .timeout(timeout)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return transport_failure(&self.name, &e, start)
        };
        if !response.status().is_success() {
            return status_failure(&self.name, response, start).await;
        }

        let message: MessagesResponse = match response.json().await {
            Ok(message) => message,
            Err(e) if e.is_timeout() => return transport_failure(&self.name, &e, start),
            Err(e) => return parse_failure(&self.name, format!("invalid messages body: {e}"), start)
        };

        let text: String = message
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();
        if text.is_empty() {
            return parse_failure(&self.name, "message has no text content".to_string(), start);
        }

        match parse_answer(&text) {
            Ok((answer, citations)) => {
                tracing::debug!(provider = %self.name, citations = citations.len(), "Provider answered");
                ProviderCallResult::success(&self.name, answer, citations, elapsed_ms(start))
            }
            Err(reason) => parse_failure(&self.name, reason, start)
        }
    }
}
