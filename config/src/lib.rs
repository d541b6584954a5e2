//! # Configuration System
//!
//! Centralized configuration for the Lexgate orchestration core.
//!
//! This crate provides:
//! - Configuration structures for every component
//! - Environment variable loading (12-factor app principles)
//! - Configuration file loading (TOML/YAML)
//! - Field validation and fail-fast startup checks

pub mod config;
pub mod file_loader;
pub mod loader;
pub mod startup;
pub mod validator;

pub use config::{
    AuthConfig, CircuitBreakerConfig, Config, GroundingConfig, GroundingKind,
    ObservabilityConfig, PolicyConfig, ProviderEntry, ProviderKind, RateLimitConfig,
    RefusalPattern, RouterConfig, ServerConfig, TrustedSource
};
pub use file_loader::{load_from_file, load_from_toml, load_from_yaml};
pub use loader::{apply_env_overrides, load, load_from_env};
pub use startup::enforce;
pub use validator::validate;
