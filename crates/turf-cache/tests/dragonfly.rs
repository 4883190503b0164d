//! Live tests for [`DragonflyStore`].
//!
//! These tests require a running Dragonfly (or Redis) instance. Run with:
//!
//! ```bash
//! docker compose up -d dragonfly
//! cargo test -p turf-cache --test dragonfly -- --ignored
//! ```
//!
//! All tests are marked `#[ignore]` so they are skipped during normal
//! `cargo test` runs.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use turf_cache::{
    Backend, CacheCoordinator, CacheStore, CoordinatorConfig, DragonflyStore, DurableStore,
};

/// Dragonfly connection URL for the local Docker instance.
const DRAGONFLY_URL: &str = "redis://localhost:6379";

#[tokio::test]
#[ignore = "requires live Dragonfly instance (docker compose up -d)"]
async fn dragonfly_set_get_delete() {
    let store = DragonflyStore::from_url(DRAGONFLY_URL).expect("valid url");
    store.connect().await.expect("Failed to connect to Dragonfly");
    store.health_check().await.expect("probe");
    store.flush_all().await.expect("flush");
    assert_eq!(store.get("test:value").await.unwrap(), None);

    let value = json!({"territories": ["docks", "hills"]});
    store.set("test:value", &value, None).await.unwrap();
    assert_eq!(store.get("test:value").await.unwrap(), Some(value));
    assert!(store.delete("test:value").await.unwrap());
    assert_eq!(store.get("test:value").await.unwrap(), None);

    store.disconnect().await.unwrap();
}

#[tokio::test]
#[ignore = "requires live Dragonfly instance (docker compose up -d)"]
async fn dragonfly_ttl_expires() {
    let store = DragonflyStore::from_url(DRAGONFLY_URL).expect("valid url");
    store.connect().await.expect("Failed to connect to Dragonfly");

    store
        .set("test:ttl", &json!(1), Some(Duration::from_secs(1)))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(store.get("test:ttl").await.unwrap(), None);

    store.disconnect().await.unwrap();
}

#[tokio::test]
#[ignore = "requires live Dragonfly instance (docker compose up -d)"]
async fn coordinator_promotes_live_dragonfly() {
    let store = DragonflyStore::from_url(DRAGONFLY_URL).expect("valid url");
    let cache = CacheCoordinator::new(Arc::new(store), CoordinatorConfig::default());
    cache.initialize().await;
    assert_eq!(cache.backend(), Backend::Primary);
    assert!(cache.health_check().await.backend_healthy);
    cache.disconnect().await.unwrap();
}
