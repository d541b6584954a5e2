//! # Startup Guard
//!
//! Fail-fast configuration invariants. `enforce` runs once at process start,
//! before any socket is bound. Every violation is fatal and never deferred to
//! request handling.

use crate::config::{Config, GroundingKind, ProviderKind};
use errors::ConfigError;
use std::collections::HashSet;

pub fn enforce(config: &Config) -> Result<(), ConfigError> {
    crate::validator::validate(config).map_err(|e| ConfigError::invalid(e.to_string()))?;

    let environment = config.environment;
    let hardened = environment.is_hardened();

    if hardened && config.policy.synthetic_citations_enabled {
        return Err(ConfigError::SyntheticCitationsInHardened {
            environment: environment.to_string()
        });
    }

    check_providers(config)?;

    if hardened
        && config
            .providers
            .iter()
            .all(|p| p.kind == ProviderKind::Scaffold)
    {
        return Err(ConfigError::EmptyProviderChain {
            environment: environment.to_string()
        });
    }

    if config.grounding.kind == GroundingKind::Http && !is_http_url(config.grounding.base_url.as_deref()) {
        return Err(ConfigError::invalid(
            "grounding.base_url must be an http(s) URL when grounding.kind = \"http\""
        ));
    }
    if hardened && config.grounding.kind == GroundingKind::Static {
        return Err(ConfigError::invalid(format!(
            "static scaffold grounding is not allowed in environment '{environment}'"
        )));
    }

    if hardened && (!config.auth.enabled || config.auth.api_keys.is_empty()) {
        return Err(ConfigError::invalid(format!(
            "auth must be enabled with at least one API key in environment '{environment}'"
        )));
    }
    if config.auth.enabled && config.auth.api_keys.iter().any(|k| k.len() < 16) {
        return Err(ConfigError::invalid("API keys must be at least 16 characters"));
    }

    for extra in &config.policy.extra_refusal_patterns {
        regex::Regex::new(&extra.pattern).map_err(|e| {
            ConfigError::invalid(format!("refusal pattern '{}' is invalid: {e}", extra.pattern))
        })?;
    }

    for source in &config.policy.trusted_sources {
        if source.hosts.iter().any(|h| h.contains('/') || h.contains(':') || h.is_empty()) {
            return Err(ConfigError::invalid(format!(
                "trusted source '{}' lists a host that is not a bare hostname",
                source.source_id
            )));
        }
    }

    tracing::info!(
        environment = %environment,
        hardened,
        providers = config.providers.len(),
        "Startup configuration checks passed"
    );
    Ok(())
}

fn check_providers(config: &Config) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for provider in &config.providers {
        if !seen.insert(provider.name.as_str()) {
            return Err(ConfigError::ProviderMisconfigured {
                provider: provider.name.clone(),
                reason: "duplicate provider name".to_string()
            });
        }

        if provider.kind == ProviderKind::Scaffold {
            continue;
        }
        if !is_http_url(provider.base_url.as_deref()) {
            return Err(ConfigError::ProviderMisconfigured {
                provider: provider.name.clone(),
                reason: "base_url must be an http(s) URL".to_string()
            });
        }
        if provider.model.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::ProviderMisconfigured {
                provider: provider.name.clone(),
                reason: "model is required".to_string()
            });
        }
    }
    Ok(())
}

fn is_http_url(url: Option<&str>) -> bool {
    url.is_some_and(|u| u.starts_with("http://") || u.starts_with("https://"))
}
