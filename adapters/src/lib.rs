//! # Provider Adapters
//!
//! The closed set of language-model adapters behind `ProviderAdapter`, the
//! grounding retrievers behind `GroundingRetriever`, and the factory that
//! assembles both from configuration.

pub mod anthropic;
pub mod factory;
pub mod grounding;
mod http;
pub mod openai;
pub mod prompt;
pub mod scaffold;

pub use anthropic::AnthropicAdapter;
pub use factory::{ProviderSlot, build_chain, build_grounding, build_provider, http_client};
pub use grounding::{HttpGroundingClient, StaticGrounding};
pub use openai::OpenAiCompatibleAdapter;
pub use scaffold::ScaffoldAdapter;
