use crate::http::{elapsed_ms, parse_failure, status_failure, transport_failure};
use crate::prompt::{parse_answer, render_system, render_user};
use async_trait::async_trait;
use lex_core::{GroundingCandidate, Prompt, ProviderAdapter, ProviderCallResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Adapter for any endpoint speaking the OpenAI chat-completions protocol.
pub struct OpenAiCompatibleAdapter {
    name: String,
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    max_tokens: u32,
    temperature: f32,
    response_format: ResponseFormat
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>
}

impl OpenAiCompatibleAdapter {
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
impl ProviderAdapter for OpenAiCompatibleAdapter {
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

        let body = ChatCompletionRequest {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: &system
                },
                Message {
                    role: "user",
                    content: &user
                }
            ],
            max_tokens: self.max_tokens,
            temperature: 0.0,
            response_format: ResponseFormat {
                kind: "json_object"
            }
        };

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .timeout(timeout)
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return transport_failure(&self.name, &e, start)
        };
        if !response.status().is_success() {
            return status_failure(&self.name, response, start).await;
        }

        let completion: ChatCompletionResponse = match response.json().await {
            Ok(completion) => completion,
            Err(e) if e.is_timeout() => return transport_failure(&self.name, &e, start),
            Err(e) => return parse_failure(&self.name, format!("invalid completion body: {e}"), start)
        };

        let Some(content) = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
        else {
            return parse_failure(&self.name, "completion has no content".to_string(), start);
        };

        match parse_answer(&content) {
            Ok((answer, citations)) => {
                tracing::debug!(provider = %self.name, citations = citations.len(), "Provider answered");
                ProviderCallResult::success(&self.name, answer, citations, elapsed_ms(start))
            }
            Err(reason) => parse_failure(&self.name, reason, start)
        }
    }
}
