use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use storage::RedisCounterStore;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::redis::Redis;
use tokio::sync::OnceCell;

static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

pub fn unique_id(prefix: &str) -> String {
    let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{prefix}-{id}")
}

/// Rate-limit client key that no other test in the process shares.
pub fn unique_client_key() -> String {
    unique_id("test-client")
}

/// Redis container backing the shared rate-limit tests. Dropping it stops
/// the container.
pub struct RedisFixture {
    _container: ContainerAsync<Redis>,
    url: String
}

impl RedisFixture {
    pub fn url(&self) -> &str {
        &self.url
    }
}

static REDIS: OnceCell<Option<RedisFixture>> = OnceCell::const_new();

/// Shared Redis container, or `None` when Docker is unavailable.
pub async fn redis() -> Option<&'static RedisFixture> {
    REDIS
        .get_or_init(|| async {
            match start_redis().await {
                Ok(fixture) => Some(fixture),
                Err(reason) => {
                    tracing::warn!(%reason, "Redis fixture unavailable");
                    None
                }
            }
        })
        .await
        .as_ref()
}

async fn start_redis() -> Result<RedisFixture, String> {
    let container = Redis::default()
        .start()
        .await
        .map_err(|e| format!("container did not start: {e}"))?;
    let port = container
        .get_host_port_ipv4(6379)
        .await
        .map_err(|e| format!("no mapped port: {e}"))?;
    let url = format!("redis://localhost:{port}");

    RedisCounterStore::new(&url, Duration::from_secs(2))
        .await
        .map_err(|e| e.to_string())?
        .ping()
        .await
        .map_err(|e| e.to_string())?;

    tracing::info!(%url, "Redis fixture started");
    Ok(RedisFixture {
        _container: container,
        url
    })
}
