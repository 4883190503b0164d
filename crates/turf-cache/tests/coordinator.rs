//! Integration tests for [`CacheCoordinator`] backend selection.
//!
//! The durable store is replaced by an instrumented in-memory mock that
//! counts connection attempts and can be told to fail connects, probes,
//! or hang on every call.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::indexing_slicing
)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use turf_cache::{
    Backend, CacheCoordinator, CacheError, CacheStore, CoordinatorConfig, DurableStore,
    SnapshotSource, load_with_default,
};
use turf_types::{Boundary, FactionId, Territory, TerritoryId};

#[derive(Default)]
struct MockDurable {
    data: Mutex<HashMap<String, Value>>,
    connects: AtomicU32,
    disconnects: AtomicU32,
    fail_connect: AtomicBool,
    fail_probe: AtomicBool,
    fail_ops: AtomicBool,
    hang: AtomicBool,
    fail_disconnect: AtomicBool,
}

impl MockDurable {
    fn contains(&self, key: &str) -> bool {
        self.data.lock().unwrap().contains_key(key)
    }

    async fn maybe_hang(&self) {
        if self.hang.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
    }

    fn check_ops(&self) -> Result<(), CacheError> {
        if self.fail_ops.load(Ordering::SeqCst) {
            Err(CacheError::BackendUnavailable(String::from("connection reset")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheStore for MockDurable {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        self.maybe_hang().await;
        self.check_ops()?;
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    async fn set(
        &self,
        key: &str,
        value: &Value,
        _ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        self.maybe_hang().await;
        self.check_ops()?;
        self.data
            .lock()
            .unwrap()
            .insert(key.to_owned(), value.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        self.maybe_hang().await;
        self.check_ops()?;
        Ok(self.data.lock().unwrap().remove(key).is_some())
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        self.maybe_hang().await;
        if self.fail_probe.load(Ordering::SeqCst) {
            return Err(CacheError::BackendUnavailable(String::from("PING refused")));
        }
        Ok(())
    }
}

#[async_trait]
impl DurableStore for MockDurable {
    async fn connect(&self) -> Result<(), CacheError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(CacheError::BackendUnavailable(String::from("connection refused")));
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), CacheError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        if self.fail_disconnect.load(Ordering::SeqCst) {
            return Err(CacheError::BackendUnavailable(String::from("QUIT failed")));
        }
        Ok(())
    }
}

fn config() -> CoordinatorConfig {
    CoordinatorConfig {
        op_timeout: Duration::from_millis(50),
        connect_timeout: Duration::from_millis(50),
    }
}

fn coordinator() -> (Arc<MockDurable>, CacheCoordinator) {
    let mock = Arc::new(MockDurable::default());
    let cache = CacheCoordinator::new(Arc::clone(&mock) as Arc<dyn DurableStore>, config());
    (mock, cache)
}

fn sample_territories() -> Vec<Territory> {
    vec![
        Territory {
            id: TerritoryId::from("docks"),
            name: String::from("Docks"),
            boundary: Boundary {
                x1: -100.0,
                y1: -50.0,
                x2: 100.0,
                y2: 50.0,
                z: Some(12.5),
            },
            controlling_faction: Some(FactionId::from("faction-7")),
            contested: true,
            value: Decimal::new(12_500, 1),
            last_update: Utc::now(),
        },
        Territory {
            id: TerritoryId::from("hills"),
            name: String::from("Hills"),
            boundary: Boundary {
                x1: 0.0,
                y1: 0.0,
                x2: 10.0,
                y2: 10.0,
                z: None,
            },
            controlling_faction: None,
            contested: false,
            value: Decimal::new(800, 0),
            last_update: Utc::now(),
        },
    ]
}

// =============================================================================
// Initialization
// =============================================================================

#[tokio::test]
async fn healthy_primary_becomes_active() {
    let (mock, cache) = coordinator();
    cache.initialize().await;
    assert_eq!(cache.backend(), Backend::Primary);

    assert!(cache.set("k", json!(1), None).await);
    assert!(mock.contains("k"));
}

#[tokio::test]
async fn failed_probe_selects_fallback() {
    let (mock, cache) = coordinator();
    mock.fail_probe.store(true, Ordering::SeqCst);
    cache.initialize().await;
    assert_eq!(cache.backend(), Backend::Fallback);

    assert!(cache.set("written", json!({"x": 1}), None).await);
    assert!(!mock.contains("written"));
    assert_eq!(cache.get("written").await, Some(json!({"x": 1})));
}

#[tokio::test]
async fn failed_connect_selects_fallback() {
    let (mock, cache) = coordinator();
    mock.fail_connect.store(true, Ordering::SeqCst);
    cache.initialize().await;
    assert_eq!(cache.backend(), Backend::Fallback);
    cache.set("k", json!(1), None).await;
    assert!(!mock.contains("k"));
}

#[tokio::test]
async fn initialize_twice_connects_once() {
    let (mock, cache) = coordinator();
    cache.initialize().await;
    cache.initialize().await;
    assert_eq!(mock.connects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn fallback_is_not_promoted_without_reinitialize() {
    let (mock, cache) = coordinator();
    mock.fail_probe.store(true, Ordering::SeqCst);
    cache.initialize().await;
    assert_eq!(cache.backend(), Backend::Fallback);

    // Backend recovers, but a second initialize is a no-op.
    mock.fail_probe.store(false, Ordering::SeqCst);
    cache.initialize().await;
    assert_eq!(cache.backend(), Backend::Fallback);

    cache.reinitialize().await;
    assert_eq!(cache.backend(), Backend::Primary);
    // The connection opened the first time is reused.
    assert_eq!(mock.connects.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Demotion
// =============================================================================

#[tokio::test]
async fn operation_error_demotes_and_retries_on_fallback() {
    let (mock, cache) = coordinator();
    cache.initialize().await;
    mock.fail_ops.store(true, Ordering::SeqCst);

    assert!(cache.set("k", json!("v"), None).await);
    assert_eq!(cache.backend(), Backend::Fallback);
    assert_eq!(cache.get("k").await, Some(json!("v")));
    assert_eq!(cache.stats().await.demotions, 1);
}

#[tokio::test]
async fn hanging_backend_times_out_and_demotes() {
    let (mock, cache) = coordinator();
    cache.initialize().await;
    mock.hang.store(true, Ordering::SeqCst);

    let value = tokio::time::timeout(Duration::from_secs(2), cache.get("k"))
        .await
        .expect("coordinator must bound durable-store calls");
    assert_eq!(value, None);
    assert_eq!(cache.backend(), Backend::Fallback);
}

#[tokio::test]
async fn health_check_captures_probe_error() {
    let (mock, cache) = coordinator();
    cache.initialize().await;
    mock.fail_probe.store(true, Ordering::SeqCst);

    let health = cache.health_check().await;
    assert_eq!(health.backend, Backend::Primary);
    assert!(!health.backend_healthy);
    assert!(health.detail.contains("PING refused"));
    assert_eq!(cache.backend(), Backend::Fallback);
}

// =============================================================================
// Disconnect
// =============================================================================

#[tokio::test]
async fn disconnect_tears_down_connected_primary() {
    let (mock, cache) = coordinator();
    cache.initialize().await;
    cache.disconnect().await.unwrap();
    assert_eq!(mock.disconnects.load(Ordering::SeqCst), 1);
    assert_eq!(cache.backend(), Backend::Fallback);
}

#[tokio::test]
async fn disconnect_skips_never_connected_primary() {
    let (mock, cache) = coordinator();
    mock.fail_connect.store(true, Ordering::SeqCst);
    cache.initialize().await;
    cache.disconnect().await.unwrap();
    assert_eq!(mock.disconnects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn disconnect_propagates_teardown_error() {
    let (mock, cache) = coordinator();
    cache.initialize().await;
    mock.fail_disconnect.store(true, Ordering::SeqCst);
    let result = cache.disconnect().await;
    assert!(matches!(result, Err(CacheError::BackendUnavailable(_))));
}

// =============================================================================
// Round-trips
// =============================================================================

#[tokio::test]
async fn territory_snapshot_round_trips_through_primary() {
    let (_mock, cache) = coordinator();
    cache.initialize().await;
    let territories = sample_territories();
    assert!(cache.set_json("world:territories", &territories, None).await);
    let back: Vec<Territory> = cache.get_json("world:territories").await.unwrap().unwrap();
    assert_eq!(back, territories);
}

#[tokio::test]
async fn territory_snapshot_round_trips_through_fallback() {
    let cache = CacheCoordinator::fallback_only(config());
    cache.initialize().await;
    let territories = sample_territories();
    assert!(cache.set_json("world:territories", &territories, None).await);
    let back: Vec<Territory> = cache.get_json("world:territories").await.unwrap().unwrap();
    assert_eq!(back, territories);
}

#[tokio::test]
async fn load_with_default_reads_primary_snapshot() {
    let (mock, cache) = coordinator();
    mock.data
        .lock()
        .unwrap()
        .insert(String::from("numbers"), json!([5, 6]));
    cache.initialize().await;
    let loaded = load_with_default(&cache, "numbers", None, || vec![1_u32], |_| Ok(())).await;
    assert_eq!(loaded.source, SnapshotSource::Persisted);
    assert_eq!(loaded.value, vec![5, 6]);
}
