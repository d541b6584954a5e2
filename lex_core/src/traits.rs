use async_trait::async_trait;
use errors::{GroundingError, StorageError};
use std::time::Duration;

use crate::types::{GroundingCandidate, Locale, Prompt, ProviderCallResult};

/// Capability every language-model backend exposes to the router.
///
/// `generate` never fails with a Rust error: adapters translate transport,
/// HTTP and SDK failures into a tagged `ProviderCallResult` so the router
/// branches only on explicit result tags.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn name(&self) -> &str;

    /// Non-production adapters are excluded from hardened provider chains.
    fn is_production(&self) -> bool {
        true
    }

    async fn generate(
        &self,
        prompt: &Prompt,
        candidates: &[GroundingCandidate],
        timeout: Duration
    ) -> ProviderCallResult;
}

/// Boundary to the retrieval/embedding index.
#[async_trait]
pub trait GroundingRetriever: Send + Sync {
    async fn retrieve(
        &self,
        query: &str,
        locale: Locale,
        k: usize
    ) -> Result<Vec<GroundingCandidate>, GroundingError>;
}

/// Windowed counter storage for the rate limiter.
#[async_trait]
pub trait CounterStore: Send + Sync {
    fn backend(&self) -> &'static str;

    /// Atomically increments `key` and returns the post-increment value.
    /// The key expires `ttl` after its first increment.
    async fn increment(&self, key: &str, ttl: Duration) -> Result<u64, StorageError>;
}
