//! Builds the ordered provider chain and the grounding retriever from
//! configuration.

use crate::anthropic::AnthropicAdapter;
use crate::grounding::{HttpGroundingClient, StaticGrounding};
use crate::openai::OpenAiCompatibleAdapter;
use crate::scaffold::ScaffoldAdapter;
use config::{Config, GroundingConfig, GroundingKind, ProviderEntry, ProviderKind};
use errors::ConfigError;
use lex_core::{GroundingRetriever, ProviderAdapter};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

const USER_AGENT: &str = concat!("lexgate/", env!("CARGO_PKG_VERSION"));

/// A configured provider and its per-attempt timeout.
#[derive(Clone)]
pub struct ProviderSlot {
    pub adapter: Arc<dyn ProviderAdapter>,
    pub timeout: Duration
}

impl std::fmt::Debug for ProviderSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSlot")
            .field("provider", &self.adapter.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

pub fn http_client() -> Result<Client, ConfigError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(5))
        .build()
        .map_err(|e| ConfigError::invalid(format!("failed to build HTTP client: {e}")))
}

pub fn build_provider(
    entry: &ProviderEntry,
    client: &Client
) -> Result<Arc<dyn ProviderAdapter>, ConfigError> {
    let misconfigured = |reason: &str| ConfigError::ProviderMisconfigured {
        provider: entry.name.clone(),
        reason: reason.to_string()
    };

    let adapter: Arc<dyn ProviderAdapter> = match entry.kind {
        ProviderKind::Scaffold => Arc::new(ScaffoldAdapter::new(&entry.name)),
        ProviderKind::OpenAiCompatible | ProviderKind::Anthropic => {
            let base_url = entry
                .base_url
                .as_deref()
                .ok_or_else(|| misconfigured("base_url is required"))?;
            let model = entry
                .model
                .clone()
                .ok_or_else(|| misconfigured("model is required"))?;
            let api_key = entry.resolve_api_key();
            if api_key.is_none() {
                tracing::warn!(provider = %entry.name, "No API key resolved for provider");
            }

            if entry.kind == ProviderKind::Anthropic {
                Arc::new(AnthropicAdapter::new(
                    &entry.name,
                    client.clone(),
                    base_url,
                    model,
                    api_key,
                    entry.max_tokens
                ))
            } else {
                Arc::new(OpenAiCompatibleAdapter::new(
                    &entry.name,
                    client.clone(),
                    base_url,
                    model,
                    api_key,
                    entry.max_tokens
                ))
            }
        }
    };
    Ok(adapter)
}

/// Builds every configured provider in configured order. Eligibility for
/// the environment is decided by the router.
pub fn build_chain(config: &Config, client: &Client) -> Result<Vec<ProviderSlot>, ConfigError> {
    if config.providers.is_empty() {
        return Err(ConfigError::EmptyProviderChain {
            environment: config.environment.to_string()
        });
    }

    config
        .providers
        .iter()
        .map(|entry| {
            Ok(ProviderSlot {
                adapter: build_provider(entry, client)?,
                timeout: Duration::from_millis(entry.timeout_ms)
            })
        })
        .collect()
}

pub fn build_grounding(
    grounding: &GroundingConfig,
    client: &Client
) -> Result<Arc<dyn GroundingRetriever>, ConfigError> {
    match grounding.kind {
        GroundingKind::Static => Ok(Arc::new(StaticGrounding::builtin())),
        GroundingKind::Http => {
            let base_url = grounding.base_url.as_deref().ok_or_else(|| {
                ConfigError::invalid("grounding.base_url is required for http grounding")
            })?;
            Ok(Arc::new(HttpGroundingClient::new(
                client.clone(),
                base_url,
                Duration::from_millis(grounding.timeout_ms)
            )))
        }
    }
}
