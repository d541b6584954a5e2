//! # Lexgate Errors
//!
//! Library error types shared by the Lexgate crates.
//!
//! - Uses `thiserror` for structured error definitions
//! - Named fields on every variant so log lines stay greppable
//! - HTTP mapping lives with the gateway, not here

use serde::Serialize;
use thiserror::Error;

/// Configuration and startup errors. All of them are fatal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Config file not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to parse {format} config: {reason}")]
    Parse { format: String, reason: String },

    #[error("Unsupported config file format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: String, value: String },

    #[error("Unknown environment tier: {value}")]
    UnknownEnvironment { value: String },

    #[error(
        "Synthetic citations are forbidden in hardened environment '{environment}'; unset \
         policy.synthetic_citations_enabled"
    )]
    SyntheticCitationsInHardened { environment: String },

    #[error("Provider chain is empty for environment '{environment}'")]
    EmptyProviderChain { environment: String },

    #[error("Provider '{provider}' is misconfigured: {reason}")]
    ProviderMisconfigured { provider: String, reason: String }
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into()
        }
    }
}

/// Counter store errors (rate limiter backing stores).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Connection to {backend} failed: {reason}")]
    ConnectionError { backend: String, reason: String },

    #[error("Query on {backend} failed: {reason}")]
    QueryError { backend: String, reason: String }
}

impl StorageError {
    pub fn backend(&self) -> &str {
        match self {
            Self::ConnectionError { backend, .. } | Self::QueryError { backend, .. } => backend
        }
    }
}

/// Grounding retrieval errors. Callers treat every variant as
/// "no grounding available" unless the environment requires grounding.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
pub enum GroundingError {
    #[error("Grounding source unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Grounding retrieval timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Grounding response invalid: {reason}")]
    InvalidResponse { reason: String }
}
