//! # Configuration Structures
//!
//! All configuration structures for the Lexgate orchestration core.
//!
//! All configuration structures:
//! - Use `serde` for serialization/deserialization with per-field defaults
//! - Use `validator` for range and length validation
//! - Are plain data; cross-field rules live in [`crate::startup`]

use lex_core::{EnvironmentTier, PolicyReason, SourceTrust};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Top-level configuration.
///
/// ## Fields
/// - `environment`: deployment tier; hardened tiers tighten safety defaults
/// - `server`: HTTP bind address and request limits
/// - `auth`: chat API keys and the separate operations token
/// - `rate_limit`: per-client quota and the shared counter store
/// - `router` / `circuit_breaker`: provider fallback behaviour
/// - `providers`: ordered provider chain (primary first)
/// - `grounding`: retrieval collaborator settings
/// - `policy`: refusal screening, citation enforcement and source trust
/// - `observability`: logging and telemetry window settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub environment: EnvironmentTier,

    #[serde(default)]
    #[validate(nested)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    #[validate(nested)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    #[validate(nested)]
    pub router: RouterConfig,

    #[serde(default)]
    #[validate(nested)]
    pub circuit_breaker: CircuitBreakerConfig,

    #[serde(default = "default_providers")]
    #[validate(length(min = 1, max = 8))]
    #[validate(nested)]
    pub providers: Vec<ProviderEntry>,

    #[serde(default)]
    #[validate(nested)]
    pub grounding: GroundingConfig,

    #[serde(default)]
    #[validate(nested)]
    pub policy: PolicyConfig,

    #[serde(default)]
    #[validate(nested)]
    pub observability: ObservabilityConfig
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: EnvironmentTier::default(),
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            rate_limit: RateLimitConfig::default(),
            router: RouterConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            providers: default_providers(),
            grounding: GroundingConfig::default(),
            policy: PolicyConfig::default(),
            observability: ObservabilityConfig::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    #[validate(length(min = 1, max = 255))]
    pub bind_address: String,

    #[serde(default = "default_port")]
    #[validate(range(min = 1))]
    pub port: u16,

    /// Maximum accepted request body in bytes
    #[serde(default = "default_body_limit")]
    #[validate(range(min = 1024, max = 1_048_576))]
    pub body_limit_bytes: usize
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_body_limit() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            body_limit_bytes: default_body_limit()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Bearer keys accepted on the chat endpoint
    #[serde(default)]
    pub api_keys: Vec<String>,

    /// Bearer token for the operational snapshot and metrics endpoints
    #[serde(default)]
    pub ops_token: Option<String>
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct RateLimitConfig {
    #[serde(default = "default_requests_per_window")]
    #[validate(range(min = 1, max = 100_000))]
    pub requests_per_window: u32,

    #[serde(default = "default_window_secs")]
    #[validate(range(min = 1, max = 3600))]
    pub window_secs: u64,

    /// Shared counter store. When unset, counters stay in-process.
    #[serde(default)]
    pub redis_url: Option<String>,

    #[serde(default = "default_key_prefix")]
    #[validate(length(min = 1, max = 64))]
    pub key_prefix: String
}

fn default_requests_per_window() -> u32 {
    20
}

fn default_window_secs() -> u64 {
    60
}

fn default_key_prefix() -> String {
    "lexgate:ratelimit".to_string()
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: default_requests_per_window(),
            window_secs: default_window_secs(),
            redis_url: None,
            key_prefix: default_key_prefix()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct RouterConfig {
    /// Hard ceiling for the whole fallback chain of one request
    #[serde(default = "default_hard_timeout_ms")]
    #[validate(range(min = 100, max = 300_000))]
    pub hard_timeout_ms: u64,

    /// Probe an open breaker anyway when it guards the last remaining provider
    #[serde(default = "default_last_resort_probe")]
    pub last_resort_probe: bool
}

fn default_hard_timeout_ms() -> u64 {
    45_000
}

fn default_last_resort_probe() -> bool {
    true
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            hard_timeout_ms: default_hard_timeout_ms(),
            last_resort_probe: default_last_resort_probe()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct CircuitBreakerConfig {
    #[serde(default = "default_failure_threshold")]
    #[validate(range(min = 1, max = 100))]
    pub failure_threshold: u32,

    #[serde(default = "default_cooldown_ms")]
    #[validate(range(min = 1_000, max = 3_600_000))]
    pub cooldown_ms: u64,

    /// Cool-down growth factor after a failed half-open probe
    #[serde(default = "default_backoff_multiplier")]
    #[validate(range(min = 1.0, max = 10.0))]
    pub backoff_multiplier: f64,

    #[serde(default = "default_max_cooldown_ms")]
    #[validate(range(max = 86_400_000))]
    pub max_cooldown_ms: u64
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_cooldown_ms() -> u64 {
    30_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_cooldown_ms() -> u64 {
    300_000
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            cooldown_ms: default_cooldown_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_cooldown_ms: default_max_cooldown_ms()
        }
    }
}

/// Closed set of provider adapter kinds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[serde(rename = "openai_compatible")]
    OpenAiCompatible,
    Anthropic,
    Scaffold
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ProviderEntry {
    #[validate(length(min = 1, max = 64))]
    pub name: String,

    pub kind: ProviderKind,

    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    /// Inline key; prefer `api_key_env`
    #[serde(default)]
    pub api_key: Option<String>,

    /// Environment variable holding the key
    #[serde(default)]
    pub api_key_env: Option<String>,

    #[serde(default = "default_provider_timeout_ms")]
    #[validate(range(min = 100, max = 120_000))]
    pub timeout_ms: u64,

    #[serde(default = "default_max_tokens")]
    #[validate(range(min = 16, max = 32_000))]
    pub max_tokens: u32
}

fn default_provider_timeout_ms() -> u64 {
    15_000
}

fn default_max_tokens() -> u32 {
    1024
}

impl ProviderEntry {
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key.clone().or_else(|| {
            self.api_key_env
                .as_deref()
                .and_then(|var| std::env::var(var).ok())
                .filter(|key| !key.is_empty())
        })
    }
}

fn default_providers() -> Vec<ProviderEntry> {
    vec![
        ProviderEntry {
            name: "primary".to_string(),
            kind: ProviderKind::OpenAiCompatible,
            base_url: Some("https://api.openai.com/v1".to_string()),
            model: Some("gpt-4o-mini".to_string()),
            api_key: None,
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            timeout_ms: default_provider_timeout_ms(),
            max_tokens: default_max_tokens()
        },
        ProviderEntry {
            name: "secondary".to_string(),
            kind: ProviderKind::Anthropic,
            base_url: Some("https://api.anthropic.com".to_string()),
            model: Some("claude-3-5-haiku-latest".to_string()),
            api_key: None,
            api_key_env: Some("ANTHROPIC_API_KEY".to_string()),
            timeout_ms: default_provider_timeout_ms(),
            max_tokens: default_max_tokens()
        },
        ProviderEntry {
            name: "scaffold".to_string(),
            kind: ProviderKind::Scaffold,
            base_url: None,
            model: None,
            api_key: None,
            api_key_env: None,
            timeout_ms: 1_000,
            max_tokens: default_max_tokens()
        },
    ]
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GroundingKind {
    Http,
    /// Built-in scaffold corpus for local development
    #[default]
    Static
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct GroundingConfig {
    #[serde(default)]
    pub kind: GroundingKind,

    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_top_k")]
    #[validate(range(min = 1, max = 50))]
    pub top_k: usize,

    #[serde(default = "default_grounding_timeout_ms")]
    #[validate(range(min = 50, max = 60_000))]
    pub timeout_ms: u64,

    /// Fail closed with SOURCE_UNAVAILABLE when retrieval yields nothing.
    /// Defaults to true in hardened environments and false elsewhere.
    #[serde(default)]
    pub required: Option<bool>
}

fn default_top_k() -> usize {
    6
}

fn default_grounding_timeout_ms() -> u64 {
    3_000
}

impl Default for GroundingConfig {
    fn default() -> Self {
        Self {
            kind: GroundingKind::default(),
            base_url: None,
            top_k: default_top_k(),
            timeout_ms: default_grounding_timeout_ms(),
            required: None
        }
    }
}

impl GroundingConfig {
    pub fn is_required(&self, environment: EnvironmentTier) -> bool {
        self.required.unwrap_or(environment.is_hardened())
    }
}

/// Extra refusal pattern on top of the built-in disallowed-intent rules.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct RefusalPattern {
    pub reason: PolicyReason,

    #[validate(length(min = 1, max = 512))]
    pub pattern: String
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct TrustedSource {
    #[validate(length(min = 1, max = 64))]
    pub source_id: String,

    /// Hosts whose URLs may be exported for this source. Subdomains match on
    /// a dot boundary.
    #[serde(default)]
    pub hosts: Vec<String>,

    #[serde(default)]
    pub trust: SourceTrust,

    #[serde(default = "default_citation_allowed")]
    pub citation_allowed: bool
}

fn default_citation_allowed() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct PolicyConfig {
    /// Substitute scaffold citations when none survive enforcement.
    /// Forbidden in hardened environments (checked at startup).
    #[serde(default)]
    pub synthetic_citations_enabled: bool,

    #[serde(default = "default_max_message_chars")]
    #[validate(range(min = 16, max = 32_000))]
    pub max_message_chars: usize,

    #[serde(default)]
    #[validate(nested)]
    pub extra_refusal_patterns: Vec<RefusalPattern>,

    #[serde(default = "default_trusted_sources")]
    #[validate(nested)]
    pub trusted_sources: Vec<TrustedSource>
}

fn default_max_message_chars() -> usize {
    4_000
}

fn default_trusted_sources() -> Vec<TrustedSource> {
    vec![
        TrustedSource {
            source_id: "fedlex".to_string(),
            hosts: vec!["fedlex.admin.ch".to_string()],
            trust: SourceTrust::Official,
            citation_allowed: true
        },
        TrustedSource {
            source_id: "bger".to_string(),
            hosts: vec!["bger.ch".to_string()],
            trust: SourceTrust::Official,
            citation_allowed: true
        },
        TrustedSource {
            source_id: "admin_ch".to_string(),
            hosts: vec!["admin.ch".to_string()],
            trust: SourceTrust::Official,
            citation_allowed: true
        },
        TrustedSource {
            source_id: "entscheidsuche".to_string(),
            hosts: vec!["entscheidsuche.ch".to_string()],
            trust: SourceTrust::Secondary,
            citation_allowed: true
        },
    ]
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            synthetic_citations_enabled: false,
            max_message_chars: default_max_message_chars(),
            extra_refusal_patterns: Vec::new(),
            trusted_sources: default_trusted_sources()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    #[validate(custom(function = "validate_log_level"))]
    pub log_level: String,

    #[serde(default = "default_log_format")]
    #[validate(custom(function = "validate_log_format"))]
    pub log_format: String,

    /// Rolling window for request/error/fallback/refusal rates
    #[serde(default = "default_telemetry_window_secs")]
    #[validate(range(min = 10, max = 3600))]
    pub telemetry_window_secs: u64,

    #[serde(default = "default_latency_samples")]
    #[validate(range(min = 16, max = 65_536))]
    pub latency_sample_capacity: usize,

    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_telemetry_window_secs() -> u64 {
    300
}

fn default_latency_samples() -> usize {
    1024
}

fn default_metrics_enabled() -> bool {
    true
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    match level {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ValidationError::new("invalid_log_level"))
    }
}

fn validate_log_format(format: &str) -> Result<(), ValidationError> {
    match format {
        "text" | "json" => Ok(()),
        _ => Err(ValidationError::new("invalid_log_format"))
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            telemetry_window_secs: default_telemetry_window_secs(),
            latency_sample_capacity: default_latency_samples(),
            metrics_enabled: default_metrics_enabled()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chain_order() {
        let config = Config::default();
        let names: Vec<&str> = config.providers.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["primary", "secondary", "scaffold"]);
    }

    #[test]
    fn test_default_quota_is_twenty_per_minute() {
        let config = RateLimitConfig::default();
        assert_eq!(config.requests_per_window, 20);
        assert_eq!(config.window_secs, 60);
    }

    #[test]
    fn test_grounding_required_follows_tier() {
        let grounding = GroundingConfig::default();
        assert!(grounding.is_required(EnvironmentTier::Production));
        assert!(!grounding.is_required(EnvironmentTier::Local));

        let explicit = GroundingConfig {
            required: Some(true),
            ..GroundingConfig::default()
        };
        assert!(explicit.is_required(EnvironmentTier::Local));
    }

    #[test]
    fn test_deserialize_minimal_toml() {
        let config: Config = toml::from_str(
            r#"
            environment = "staging"

            [policy]
            synthetic_citations_enabled = false
            "#
        )
        .unwrap();
        assert_eq!(config.environment, EnvironmentTier::Staging);
        assert_eq!(config.providers.len(), 3);
        assert_eq!(config.policy.trusted_sources.len(), 4);
    }

    #[test]
    fn test_resolve_api_key_prefers_inline() {
        let entry = ProviderEntry {
            api_key: Some("inline".to_string()),
            api_key_env: Some("LEXGATE_TEST_UNSET_KEY".to_string()),
            ..default_providers().remove(0)
        };
        assert_eq!(entry.resolve_api_key().as_deref(), Some("inline"));
    }
}
