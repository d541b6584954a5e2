//! Integration tests for the Redis counter store
//!
//! These tests use testcontainers to spin up a Redis instance.

use lex_core::CounterStore;
use std::sync::Arc;
use std::time::Duration;
use storage::RedisCounterStore;
use testcontainers::ContainerAsync;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::redis::Redis;

async fn setup_redis_container()
-> Result<(ContainerAsync<Redis>, String), Box<dyn std::error::Error>> {
    let container = Redis::default().start().await?;

    let port = container.get_host_port_ipv4(6379).await?;
    let connection_url = format!("redis://localhost:{}", port);

    Ok((container, connection_url))
}

#[tokio::test]
async fn test_redis_increment_counts() {
    match setup_redis_container().await {
        Ok((_container, connection_url)) => {
            let store = RedisCounterStore::new(&connection_url, Duration::from_secs(2))
                .await
                .expect("Failed to create Redis counter store");
            let ttl = Duration::from_secs(60);

            assert_eq!(store.increment("ratelimit:a:1", ttl).await.unwrap(), 1);
            assert_eq!(store.increment("ratelimit:a:1", ttl).await.unwrap(), 2);
            assert_eq!(store.increment("ratelimit:b:1", ttl).await.unwrap(), 1);
            assert!(store.ping().await.is_ok());
        }
        Err(_) => {
            eprintln!("Skipping Redis test: Docker not available");
        }
    }
}

#[tokio::test]
async fn test_redis_counter_expires_with_window() {
    match setup_redis_container().await {
        Ok((_container, connection_url)) => {
            let store = RedisCounterStore::new(&connection_url, Duration::from_secs(2))
                .await
                .expect("Failed to create Redis counter store");
            let ttl = Duration::from_millis(500);

            assert_eq!(store.increment("ratelimit:ttl:1", ttl).await.unwrap(), 1);
            assert_eq!(store.increment("ratelimit:ttl:1", ttl).await.unwrap(), 2);

            tokio::time::sleep(Duration::from_millis(1200)).await;

            assert_eq!(
                store.increment("ratelimit:ttl:1", ttl).await.unwrap(),
                1,
                "Counter should restart after expiry"
            );
        }
        Err(_) => {
            eprintln!("Skipping Redis test: Docker not available");
        }
    }
}

#[tokio::test]
async fn test_redis_concurrent_increments_are_atomic() {
    match setup_redis_container().await {
        Ok((_container, connection_url)) => {
            let store = Arc::new(
                RedisCounterStore::new(&connection_url, Duration::from_secs(2))
                    .await
                    .expect("Failed to create Redis counter store")
            );
            let ttl = Duration::from_secs(60);

            let handles: Vec<_> = (0..50)
                .map(|_| {
                    let store = store.clone();
                    tokio::spawn(async move { store.increment("ratelimit:c:1", ttl).await })
                })
                .collect();

            let mut counts = Vec::new();
            for handle in handles {
                counts.push(handle.await.unwrap().unwrap());
            }
            counts.sort_unstable();

            assert_eq!(counts, (1..=50).collect::<Vec<u64>>());
        }
        Err(_) => {
            eprintln!("Skipping Redis test: Docker not available");
        }
    }
}
