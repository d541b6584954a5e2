//! # Environment Variable Loader
//!
//! Loads configuration following 12-factor app principles: defaults, then an
//! optional config file named by `LEXGATE_CONFIG`, then `LEXGATE_*`
//! environment overrides.
//!
//! ## Environment Variables
//! - `LEXGATE_CONFIG`: path to a `.toml`, `.yaml` or `.yml` file
//! - `LEXGATE_ENVIRONMENT`: local/development/ci/staging/production
//! - `LEXGATE_BIND_ADDRESS`, `LEXGATE_PORT`
//! - `LEXGATE_AUTH_ENABLED`, `LEXGATE_API_KEYS` (comma separated), `LEXGATE_OPS_TOKEN`
//! - `LEXGATE_RATE_LIMIT_REQUESTS`, `LEXGATE_RATE_LIMIT_WINDOW_SECS`, `LEXGATE_REDIS_URL`
//! - `LEXGATE_ROUTER_HARD_TIMEOUT_MS`, `LEXGATE_LAST_RESORT_PROBE`
//! - `LEXGATE_BREAKER_FAILURE_THRESHOLD`, `LEXGATE_BREAKER_COOLDOWN_MS`
//! - `LEXGATE_GROUNDING_URL`, `LEXGATE_GROUNDING_REQUIRED`
//! - `LEXGATE_SYNTHETIC_CITATIONS`
//! - `LEXGATE_LOG_LEVEL`, `LEXGATE_LOG_FORMAT`

use crate::config::{Config, GroundingKind};
use crate::file_loader::load_from_file;
use errors::ConfigError;
use lex_core::EnvironmentTier;
use std::env;
use std::path::Path;
use std::str::FromStr;

/// Loads the full configuration: file (if `LEXGATE_CONFIG` is set) plus
/// environment overrides. Does not run startup checks.
pub fn load() -> Result<Config, ConfigError> {
    let mut config = match env_string("LEXGATE_CONFIG") {
        Some(path) => load_from_file(Path::new(&path))?,
        None => Config::default()
    };
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Loads defaults plus environment overrides, ignoring any config file.
pub fn load_from_env() -> Result<Config, ConfigError> {
    let mut config = Config::default();
    apply_env_overrides(&mut config)?;
    Ok(config)
}

pub fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
    if let Some(value) = env_string("LEXGATE_ENVIRONMENT") {
        config.environment = EnvironmentTier::from_str(&value)
            .map_err(|_| ConfigError::UnknownEnvironment { value })?;
    }

    if let Some(addr) = env_string("LEXGATE_BIND_ADDRESS") {
        config.server.bind_address = addr;
    }
    set_parsed("LEXGATE_PORT", &mut config.server.port)?;

    set_flag("LEXGATE_AUTH_ENABLED", &mut config.auth.enabled)?;
    if let Some(keys) = env_string("LEXGATE_API_KEYS") {
        config.auth.api_keys = split_list(&keys);
    }
    if let Some(token) = env_string("LEXGATE_OPS_TOKEN") {
        config.auth.ops_token = Some(token);
    }

    set_parsed(
        "LEXGATE_RATE_LIMIT_REQUESTS",
        &mut config.rate_limit.requests_per_window
    )?;
    set_parsed(
        "LEXGATE_RATE_LIMIT_WINDOW_SECS",
        &mut config.rate_limit.window_secs
    )?;
    if let Some(url) = env_string("LEXGATE_REDIS_URL") {
        config.rate_limit.redis_url = Some(url);
    }

    set_parsed(
        "LEXGATE_ROUTER_HARD_TIMEOUT_MS",
        &mut config.router.hard_timeout_ms
    )?;
    set_flag(
        "LEXGATE_LAST_RESORT_PROBE",
        &mut config.router.last_resort_probe
    )?;
    set_parsed(
        "LEXGATE_BREAKER_FAILURE_THRESHOLD",
        &mut config.circuit_breaker.failure_threshold
    )?;
    set_parsed(
        "LEXGATE_BREAKER_COOLDOWN_MS",
        &mut config.circuit_breaker.cooldown_ms
    )?;

    if let Some(url) = env_string("LEXGATE_GROUNDING_URL") {
        config.grounding.kind = GroundingKind::Http;
        config.grounding.base_url = Some(url);
    }
    if let Some(raw) = env_string("LEXGATE_GROUNDING_REQUIRED") {
        config.grounding.required = Some(parse_bool("LEXGATE_GROUNDING_REQUIRED", &raw)?);
    }

    set_flag(
        "LEXGATE_SYNTHETIC_CITATIONS",
        &mut config.policy.synthetic_citations_enabled
    )?;

    if let Some(level) = env_string("LEXGATE_LOG_LEVEL") {
        config.observability.log_level = level.to_lowercase();
    }
    if let Some(format) = env_string("LEXGATE_LOG_FORMAT") {
        config.observability.log_format = format.to_lowercase();
    }

    Ok(())
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn set_parsed<T: FromStr>(key: &str, target: &mut T) -> Result<(), ConfigError> {
    if let Some(raw) = env_string(key) {
        *target = raw.parse().map_err(|_| ConfigError::InvalidEnv {
            key: key.to_string(),
            value: raw
        })?;
    }
    Ok(())
}

fn set_flag(key: &str, target: &mut bool) -> Result<(), ConfigError> {
    if let Some(raw) = env_string(key) {
        *target = parse_bool(key, &raw)?;
    }
    Ok(())
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            key: key.to_string(),
            value: raw.to_string()
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "LEXGATE_CONFIG",
        "LEXGATE_ENVIRONMENT",
        "LEXGATE_PORT",
        "LEXGATE_API_KEYS",
        "LEXGATE_SYNTHETIC_CITATIONS",
        "LEXGATE_RATE_LIMIT_REQUESTS",
        "LEXGATE_GROUNDING_URL"
    ];

    fn clear_env() {
        for key in KEYS {
            unsafe {
                env::remove_var(key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_load_from_env_defaults() {
        clear_env();
        let config = load_from_env().unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    #[serial]
    fn test_load_from_env_overrides() {
        clear_env();
        unsafe {
            env::set_var("LEXGATE_ENVIRONMENT", "staging");
            env::set_var("LEXGATE_PORT", "9090");
            env::set_var("LEXGATE_API_KEYS", "key-a, key-b,,");
            env::set_var("LEXGATE_RATE_LIMIT_REQUESTS", "5");
            env::set_var("LEXGATE_GROUNDING_URL", "http://retriever:8000");
        }

        let config = load_from_env().unwrap();
        assert_eq!(config.environment, EnvironmentTier::Staging);
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.auth.api_keys, vec!["key-a", "key-b"]);
        assert_eq!(config.rate_limit.requests_per_window, 5);
        assert_eq!(config.grounding.kind, GroundingKind::Http);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_unknown_environment_is_rejected() {
        clear_env();
        unsafe {
            env::set_var("LEXGATE_ENVIRONMENT", "prod-eu");
        }
        assert_eq!(
            load_from_env().unwrap_err(),
            ConfigError::UnknownEnvironment {
                value: "prod-eu".to_string()
            }
        );
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_flag_is_rejected() {
        clear_env();
        unsafe {
            env::set_var("LEXGATE_SYNTHETIC_CITATIONS", "maybe");
        }
        assert!(matches!(
            load_from_env(),
            Err(ConfigError::InvalidEnv { .. })
        ));
        clear_env();
    }

    #[test]
    fn test_parse_bool_variants() {
        assert!(parse_bool("K", "ON").unwrap());
        assert!(!parse_bool("K", "0").unwrap());
        assert!(parse_bool("K", "truthy").is_err());
    }
}
