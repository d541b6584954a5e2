use async_trait::async_trait;
use errors::StorageError;
use lex_core::CounterStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

const BACKEND: &str = "Redis";

/// Increments the window counter and arms its expiry on the first hit, in a
/// single round trip so concurrent admissions never lose an update.
const INCREMENT_SCRIPT: &str = r#"
local count = redis.call("INCR", KEYS[1])
if count == 1 then
    redis.call("PEXPIRE", KEYS[1], ARGV[1])
end
return count
"#;

pub struct RedisCounterStore {
    client: Arc<redis::Client>,
    connection: OnceCell<redis::aio::ConnectionManager>,
    script: redis::Script,
    op_timeout: Duration
}

fn open_client(connection_string: &str) -> Result<redis::Client, StorageError> {
    redis::Client::open(connection_string).map_err(|e| StorageError::ConnectionError {
        backend: BACKEND.to_string(),
        reason: e.to_string()
    })
}

impl RedisCounterStore {
    /// Connects eagerly and fails when the server cannot be reached within
    /// `op_timeout`.
    pub async fn new(connection_string: &str, op_timeout: Duration) -> Result<Self, StorageError> {
        let store = Self::lazy(connection_string, op_timeout)?;
        store.connection().await?;
        tracing::info!(backend = BACKEND, "Connected counter store");
        Ok(store)
    }

    /// Validates the URL only. The connection is established on first use
    /// and retried on later calls until it succeeds.
    pub fn lazy(connection_string: &str, op_timeout: Duration) -> Result<Self, StorageError> {
        Ok(Self {
            client: Arc::new(open_client(connection_string)?),
            connection: OnceCell::new(),
            script: redis::Script::new(INCREMENT_SCRIPT),
            op_timeout
        })
    }

    pub fn client(&self) -> &redis::Client {
        &self.client
    }

    async fn connection(&self) -> Result<redis::aio::ConnectionManager, StorageError> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                tokio::time::timeout(self.op_timeout, self.client.get_connection_manager())
                    .await
                    .map_err(|_| StorageError::ConnectionError {
                        backend: BACKEND.to_string(),
                        reason: format!(
                            "connect timed out after {}ms",
                            self.op_timeout.as_millis()
                        )
                    })?
                    .map_err(|e| StorageError::ConnectionError {
                        backend: BACKEND.to_string(),
                        reason: e.to_string()
                    })
            })
            .await?;
        Ok(manager.clone())
    }

    pub async fn ping(&self) -> Result<(), StorageError> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| StorageError::QueryError {
                backend: BACKEND.to_string(),
                reason: e.to_string()
            })?;
        Ok(())
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn increment(&self, key: &str, ttl: Duration) -> Result<u64, StorageError> {
        let mut conn = self.connection().await?;
        let ttl_ms = ttl.as_millis().max(1) as u64;

        let mut invocation = self.script.key(key);
        invocation.arg(ttl_ms);

        let count: u64 = tokio::time::timeout(self.op_timeout, invocation.invoke_async(&mut conn))
            .await
            .map_err(|_| StorageError::QueryError {
                backend: BACKEND.to_string(),
                reason: format!("increment timed out after {}ms", self.op_timeout.as_millis())
            })?
            .map_err(|e| StorageError::QueryError {
                backend: BACKEND.to_string(),
                reason: e.to_string()
            })?;

        Ok(count)
    }
}
