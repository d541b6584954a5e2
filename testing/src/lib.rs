//! Shared test doubles and fixtures for the Lexgate workspace.
//!
//! - scripted provider adapters with call counters and latency
//! - fixed and failing grounding retrievers
//! - a counter store that always fails, for degraded rate limiting
//! - configuration builders for local and hardened tiers
//! - a lazily started Redis testcontainer shared per test process

mod configs;
mod doubles;
mod fixtures;

pub use configs::*;
pub use doubles::*;
pub use fixtures::*;
