use async_trait::async_trait;
use dashmap::DashMap;
use errors::StorageError;
use lex_core::CounterStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

const BACKEND: &str = "Local";
const SWEEP_EVERY: u64 = 1024;

#[derive(Debug, Clone, Copy)]
struct WindowCounter {
    count: u64,
    expires_at: Instant
}

/// In-process counter store.
///
/// Each key is updated under its `DashMap` shard lock, so increments on the
/// same key are linearizable. Expired counters restart at one and are swept
/// periodically.
#[derive(Debug, Default)]
pub struct LocalCounterStore {
    counters: DashMap<String, WindowCounter>,
    ops: AtomicU64
}

impl LocalCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.counters.retain(|_, counter| counter.expires_at > now);
    }

    fn bump(&self, key: &str, ttl: Duration) -> u64 {
        let now = Instant::now();
        let mut entry = self
            .counters
            .entry(key.to_string())
            .or_insert(WindowCounter {
                count: 0,
                expires_at: now + ttl
            });

        if entry.expires_at <= now {
            entry.count = 0;
            entry.expires_at = now + ttl;
        }
        entry.count += 1;
        entry.count
    }
}

#[async_trait]
impl CounterStore for LocalCounterStore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn increment(&self, key: &str, ttl: Duration) -> Result<u64, StorageError> {
        let count = self.bump(key, ttl);

        if self.ops.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.purge_expired();
        }

        Ok(count)
    }
}
