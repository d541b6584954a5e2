//! # Configuration File Loading
//!
//! Loads configuration from TOML or YAML files. The format is detected from
//! the file extension. Fields missing from the file keep their defaults.

use crate::config::Config;
use errors::ConfigError;
use std::path::Path;

/// Load configuration from a TOML file.
pub fn load_from_toml(path: &Path) -> Result<Config, ConfigError> {
    let contents = read(path)?;
    toml::from_str(&contents).map_err(|e| ConfigError::Parse {
        format: "TOML".to_string(),
        reason: e.to_string()
    })
}

/// Load configuration from a YAML file.
pub fn load_from_yaml(path: &Path) -> Result<Config, ConfigError> {
    let contents = read(path)?;
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        format: "YAML".to_string(),
        reason: e.to_string()
    })
}

/// Load configuration from file, detecting the format from its extension.
///
/// ## Supported Formats
/// - `.toml`
/// - `.yaml` / `.yml`
pub fn load_from_file(path: &Path) -> Result<Config, ConfigError> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "toml" => load_from_toml(path),
        "yaml" | "yml" => load_from_yaml(path),
        other => Err(ConfigError::UnsupportedFormat {
            extension: other.to_string()
        })
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.display().to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GroundingKind, ProviderKind};
    use lex_core::EnvironmentTier;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_from_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lexgate.toml");
        fs::write(
            &path,
            r#"
environment = "production"

[auth]
enabled = true
api_keys = ["k1"]

[rate_limit]
requests_per_window = 50
redis_url = "redis://cache:6379"

[[providers]]
name = "primary"
kind = "openai_compatible"
base_url = "https://llm.internal/v1"
model = "legal-small"
timeout_ms = 8000

[grounding]
kind = "http"
base_url = "http://retriever:8000"
"#
        )
        .unwrap();

        let config = load_from_toml(&path).unwrap();
        assert_eq!(config.environment, EnvironmentTier::Production);
        assert_eq!(config.rate_limit.requests_per_window, 50);
        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.providers[0].kind, ProviderKind::OpenAiCompatible);
        assert_eq!(config.providers[0].timeout_ms, 8000);
        assert_eq!(config.grounding.kind, GroundingKind::Http);
    }

    #[test]
    fn test_load_from_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lexgate.yml");
        fs::write(
            &path,
            r#"
environment: development
policy:
  synthetic_citations_enabled: true
  trusted_sources:
    - source_id: fedlex
      hosts: [fedlex.admin.ch]
      trust: official
circuit_breaker:
  failure_threshold: 5
"#
        )
        .unwrap();

        let config = load_from_file(&path).unwrap();
        assert_eq!(config.environment, EnvironmentTier::Development);
        assert!(config.policy.synthetic_citations_enabled);
        assert_eq!(config.policy.trusted_sources.len(), 1);
        assert!(config.policy.trusted_sources[0].citation_allowed);
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
    }

    #[test]
    fn test_load_from_file_unsupported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lexgate.json");
        fs::write(&path, "{}").unwrap();

        assert!(matches!(
            load_from_file(&path),
            Err(ConfigError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_load_from_toml_invalid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[invalid\n").unwrap();

        assert!(matches!(
            load_from_toml(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_load_from_toml_not_found() {
        let result = load_from_toml(Path::new("/nonexistent/path/lexgate.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }
}
