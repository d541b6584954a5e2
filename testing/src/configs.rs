use config::{Config, GroundingKind};
use lex_core::EnvironmentTier;

pub const TEST_API_KEY: &str = "test-api-key-0123456789";
pub const TEST_OPS_TOKEN: &str = "test-ops-token-0123456789";

/// Local tier defaults with a generous rate limit.
pub fn local_config() -> Config {
    let mut config = Config::default();
    config.environment = EnvironmentTier::Local;
    config.rate_limit.requests_per_window = 1_000;
    config
}

/// Configuration that passes the hardened startup guard for `environment`.
pub fn hardened_config(environment: EnvironmentTier) -> Config {
    let mut config = Config::default();
    config.environment = environment;
    config.auth.enabled = true;
    config.auth.api_keys = vec![TEST_API_KEY.to_string()];
    config.auth.ops_token = Some(TEST_OPS_TOKEN.to_string());
    config.grounding.kind = GroundingKind::Http;
    config.grounding.base_url = Some("http://retriever.internal:8000".to_string());
    config.rate_limit.requests_per_window = 1_000;
    config
}

pub fn production_config() -> Config {
    hardened_config(EnvironmentTier::Production)
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}
