//! # Lexgate Core
//!
//! Domain types and the capability traits that sit at the seams between the
//! orchestrator and its external collaborators (language-model providers,
//! the grounding index and the rate-limit counter store).

pub mod traits;
pub mod types;

pub use traits::{CounterStore, GroundingRetriever, ProviderAdapter};
pub use types::*;
