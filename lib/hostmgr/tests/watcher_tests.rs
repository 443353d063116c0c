//! Watcher delivery tests against a live Redis instance.
//!
//! Ignored by default; run with `cargo test -- --ignored` against a
//! local Redis. The address can be overridden with
//! `HOSTMGR_TEST_REDIS_URL`.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hostmgr::RegistryWatcher;
use redis::AsyncCommands;

fn redis_url() -> String {
    std::env::var("HOSTMGR_TEST_REDIS_URL")
        .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

async fn wait_for_count(counter: &AtomicU32, expected: u32) -> bool {
    for _ in 0..50 {
        if counter.load(Ordering::SeqCst) >= expected {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}

#[tokio::test]
#[ignore = "Requires a running Redis instance"]
async fn test_one_callback_per_key_mutation() {
    let url = redis_url();
    // Unique namespace so concurrent test runs cannot observe each
    // other's mutations.
    let namespace = format!("/hostmgr-watch-test-{}", std::process::id());

    let watcher = Arc::new(RegistryWatcher::new(&url, &namespace));
    let deliveries = Arc::new(AtomicU32::new(0));

    let watch = Arc::clone(&watcher);
    let counter = Arc::clone(&deliveries);
    let handle = tokio::spawn(async move {
        watch
            .start(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await
    });

    // Let the pattern subscription be acknowledged before mutating.
    tokio::time::sleep(Duration::from_millis(500)).await;

    let client = redis::Client::open(url.as_str()).unwrap();
    let mut conn = client.get_multiplexed_async_connection().await.unwrap();

    let key = format!("{}/hosts/h1-10.0.0.1-alice", namespace);
    let _: () = conn.set(&key, "{}").await.unwrap();

    assert!(
        wait_for_count(&deliveries, 1).await,
        "no callback delivered after SET"
    );
    // Only the keyspace channel matches the subscription pattern, so
    // one mutation is exactly one delivery.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(deliveries.load(Ordering::SeqCst), 1);

    let _: () = conn.del(&key).await.unwrap();

    assert!(
        wait_for_count(&deliveries, 2).await,
        "no callback delivered after DEL"
    );
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(deliveries.load(Ordering::SeqCst), 2);

    watcher.stop();
    let result = handle.await.unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
#[ignore = "Requires a running Redis instance"]
async fn test_mutations_outside_namespace_are_not_delivered() {
    let url = redis_url();
    let namespace = format!("/hostmgr-scope-test-{}", std::process::id());

    let watcher = Arc::new(RegistryWatcher::new(&url, &namespace));
    let deliveries = Arc::new(AtomicU32::new(0));

    let watch = Arc::clone(&watcher);
    let counter = Arc::clone(&deliveries);
    let handle = tokio::spawn(async move {
        watch
            .start(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await
    });

    tokio::time::sleep(Duration::from_millis(500)).await;

    let client = redis::Client::open(url.as_str()).unwrap();
    let mut conn = client.get_multiplexed_async_connection().await.unwrap();

    let foreign_key = format!("/elsewhere-{}/hosts/h9", std::process::id());
    let _: () = conn.set(&foreign_key, "{}").await.unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(deliveries.load(Ordering::SeqCst), 0);

    let _: () = conn.del(&foreign_key).await.unwrap();
    watcher.stop();
    let result = handle.await.unwrap();
    assert!(result.is_ok());
}
