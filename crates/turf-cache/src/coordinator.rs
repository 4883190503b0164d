//! Backend selection and the blended cache surface.
//!
//! The [`CacheCoordinator`] owns the durable store and the in-process
//! fallback and routes every operation to whichever is active.
//!
//! # States
//!
//! ```text
//!   initialize()
//!        |
//!        +-- connect + probe ok ----> Primary-Active
//!        |                                 |
//!        +-- connect/probe failed -+       | op error / timeout / failed probe
//!                                  v       v
//!                              Fallback-Active
//!                                  |
//!                                  +-- reinitialize() only
//! ```
//!
//! Demotion is automatic; promotion never is. Backend failures are logged
//! at warn level and absorbed, so callers only ever see values or misses.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::CacheError;
use crate::memory::MemoryStore;
use crate::store::DurableStore;

/// Default deadline for a single durable-store operation.
const DEFAULT_OP_TIMEOUT: Duration = Duration::from_millis(500);

/// Default deadline for opening the durable-store connection.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Timeouts applied to durable-store calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Deadline for each get/set/delete/probe.
    pub op_timeout: Duration,
    /// Deadline for the initial connection.
    pub connect_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            op_timeout: DEFAULT_OP_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// Which backend is serving requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backend {
    /// The durable store.
    Primary,
    /// The in-process fallback store.
    Fallback,
}

/// Composite health result. Probe errors are captured in `detail`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheHealth {
    /// Backend that was probed.
    pub backend: Backend,
    /// Whether the probe succeeded.
    pub backend_healthy: bool,
    /// Human-readable probe outcome.
    pub detail: String,
}

/// Operation counters since construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Backend currently serving requests.
    pub backend: Backend,
    /// Whether [`CacheCoordinator::initialize`] has completed.
    pub initialized: bool,
    /// Reads that found a value.
    pub hits: u64,
    /// Reads that found nothing.
    pub misses: u64,
    /// Successful writes.
    pub writes: u64,
    /// Successful deletes of an existing key.
    pub deletes: u64,
    /// Times the coordinator fell back from the durable store.
    pub demotions: u64,
    /// Live entries in the fallback store.
    pub fallback_keys: usize,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    deletes: AtomicU64,
    demotions: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Default)]
struct Lifecycle {
    initialized: bool,
    connected: bool,
}

/// One get/set/delete/stats/health surface over a durable store and an
/// in-process fallback.
///
/// Construct it explicitly at process start, call
/// [`initialize`](Self::initialize) once, share it behind an [`Arc`], and
/// call [`disconnect`](Self::disconnect) during shutdown.
pub struct CacheCoordinator {
    primary: Option<Arc<dyn DurableStore>>,
    fallback: MemoryStore,
    config: CoordinatorConfig,
    lifecycle: Mutex<Lifecycle>,
    primary_active: AtomicBool,
    counters: Counters,
}

impl CacheCoordinator {
    /// Create a coordinator over the given durable store.
    ///
    /// Nothing is connected until [`initialize`](Self::initialize).
    pub fn new(primary: Arc<dyn DurableStore>, config: CoordinatorConfig) -> Self {
        Self::build(Some(primary), config)
    }

    /// Create a coordinator that only ever uses the in-process store.
    pub fn fallback_only(config: CoordinatorConfig) -> Self {
        Self::build(None, config)
    }

    fn build(primary: Option<Arc<dyn DurableStore>>, config: CoordinatorConfig) -> Self {
        Self {
            primary,
            fallback: MemoryStore::new(),
            config,
            lifecycle: Mutex::new(Lifecycle::default()),
            primary_active: AtomicBool::new(false),
            counters: Counters::default(),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Connect and probe the durable store, then pick the active backend.
    ///
    /// Idempotent: once initialized, further calls return immediately
    /// without touching the durable store.
    pub async fn initialize(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.initialized {
            debug!("Cache coordinator already initialized");
            return;
        }
        self.select_backend(&mut lifecycle).await;
    }

    /// Re-run backend selection, allowing promotion back to the durable
    /// store. An existing connection is reused rather than reopened.
    pub async fn reinitialize(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        lifecycle.initialized = false;
        self.select_backend(&mut lifecycle).await;
    }

    async fn select_backend(&self, lifecycle: &mut Lifecycle) {
        lifecycle.initialized = true;
        self.primary_active.store(false, Ordering::SeqCst);

        let Some(primary) = self.primary.as_ref() else {
            warn!("No durable store configured, using in-process fallback");
            return;
        };

        if !lifecycle.connected {
            match timeout(self.config.connect_timeout, primary.connect()).await {
                Ok(Ok(())) => lifecycle.connected = true,
                Ok(Err(e)) => {
                    warn!(error = %e, "Durable store connection failed, using in-process fallback");
                    return;
                }
                Err(_) => {
                    warn!(
                        timeout_ms = millis(self.config.connect_timeout),
                        "Durable store connection timed out, using in-process fallback"
                    );
                    return;
                }
            }
        }

        match self.probe(primary.as_ref()).await {
            Ok(()) => {
                self.primary_active.store(true, Ordering::SeqCst);
                info!("Cache coordinator using durable store");
            }
            Err(e) => {
                warn!(error = %e, "Durable store health probe failed, using in-process fallback");
            }
        }
    }

    /// Close the durable-store connection if one was ever opened.
    ///
    /// Afterwards all operations are served by the fallback store until the
    /// coordinator is initialized again.
    ///
    /// # Errors
    ///
    /// Propagates the durable store's teardown error.
    pub async fn disconnect(&self) -> Result<(), CacheError> {
        let mut lifecycle = self.lifecycle.lock().await;
        self.primary_active.store(false, Ordering::SeqCst);
        lifecycle.initialized = false;
        if !lifecycle.connected {
            return Ok(());
        }
        if let Some(primary) = self.primary.as_ref() {
            primary.disconnect().await?;
        }
        lifecycle.connected = false;
        Ok(())
    }

    // =========================================================================
    // Blended operations
    // =========================================================================

    /// Read the value at `key` from the active backend.
    pub async fn get(&self, key: &str) -> Option<Value> {
        let value = match self.get_raw(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Discarding unreadable cache value");
                None
            }
        };
        self.count_read(value.is_some());
        value
    }

    /// Read and decode the value at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Serialization`] if a value is present but does
    /// not decode as `T`. Backend failures are absorbed.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let raw = self.get_raw(key).await;
        self.count_read(matches!(raw, Ok(Some(_))));
        match raw? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn get_raw(&self, key: &str) -> Result<Option<Value>, CacheError> {
        if let Some(primary) = self.active_primary() {
            match self.bounded("get", primary.get(key)).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_backend_failure() => self.demote("get", &e),
                Err(e) => return Err(e),
            }
        }
        Ok(self.fallback.get_value(key))
    }

    /// Write `value` at `key` on the active backend. Returns whether the
    /// write landed; with the fallback in place this is always `true`.
    pub async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> bool {
        if let Some(primary) = self.active_primary() {
            match self.bounded("set", primary.set(key, &value, ttl)).await {
                Ok(()) => {
                    Counters::bump(&self.counters.writes);
                    return true;
                }
                Err(e) if e.is_backend_failure() => self.demote("set", &e),
                Err(e) => {
                    warn!(key, error = %e, "Durable store rejected value");
                    return false;
                }
            }
        }
        self.fallback.set_value(key, value, ttl);
        Counters::bump(&self.counters.writes);
        true
    }

    /// Encode `value` as JSON and write it at `key`.
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> bool {
        match serde_json::to_value(value) {
            Ok(json) => self.set(key, json, ttl).await,
            Err(e) => {
                warn!(key, error = %e, "Failed to encode cache value");
                false
            }
        }
    }

    /// Remove `key` from the active backend. Returns whether it existed.
    pub async fn delete(&self, key: &str) -> bool {
        if let Some(primary) = self.active_primary() {
            match self.bounded("delete", primary.delete(key)).await {
                Ok(removed) => {
                    if removed {
                        Counters::bump(&self.counters.deletes);
                    }
                    return removed;
                }
                Err(e) => self.demote("delete", &e),
            }
        }
        let removed = self.fallback.remove(key);
        if removed {
            Counters::bump(&self.counters.deletes);
        }
        removed
    }

    /// Probe the active backend. Never fails; errors land in `detail`.
    ///
    /// A failed durable-store probe demotes the coordinator.
    pub async fn health_check(&self) -> CacheHealth {
        let Some(primary) = self.active_primary() else {
            return CacheHealth {
                backend: Backend::Fallback,
                backend_healthy: true,
                detail: format!("in-process store serving {} keys", self.fallback.len()),
            };
        };
        match self.probe(primary.as_ref()).await {
            Ok(()) => CacheHealth {
                backend: Backend::Primary,
                backend_healthy: true,
                detail: String::from("durable store reachable"),
            },
            Err(e) => {
                self.demote("health_check", &e);
                CacheHealth {
                    backend: Backend::Primary,
                    backend_healthy: false,
                    detail: e.to_string(),
                }
            }
        }
    }

    /// Counters and backend selection.
    pub async fn stats(&self) -> CacheStats {
        let initialized = self.lifecycle.lock().await.initialized;
        CacheStats {
            backend: self.backend(),
            initialized,
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
            deletes: self.counters.deletes.load(Ordering::Relaxed),
            demotions: self.counters.demotions.load(Ordering::Relaxed),
            fallback_keys: self.fallback.len(),
        }
    }

    /// Which backend is currently active.
    pub fn backend(&self) -> Backend {
        if self.primary_active.load(Ordering::SeqCst) {
            Backend::Primary
        } else {
            Backend::Fallback
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn active_primary(&self) -> Option<&Arc<dyn DurableStore>> {
        if self.primary_active.load(Ordering::SeqCst) {
            self.primary.as_ref()
        } else {
            None
        }
    }

    async fn probe(&self, primary: &dyn DurableStore) -> Result<(), CacheError> {
        self.bounded("health_check", primary.health_check()).await
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        timeout(self.config.op_timeout, fut)
            .await
            .unwrap_or_else(|_| {
                Err(CacheError::Timeout {
                    operation,
                    timeout_ms: millis(self.config.op_timeout),
                })
            })
    }

    fn demote(&self, operation: &'static str, error: &CacheError) {
        if self.primary_active.swap(false, Ordering::SeqCst) {
            Counters::bump(&self.counters.demotions);
            warn!(
                operation,
                error = %error,
                "Durable store failed, switching to in-process fallback"
            );
        }
    }

    fn count_read(&self, hit: bool) {
        if hit {
            Counters::bump(&self.counters.hits);
        } else {
            Counters::bump(&self.counters.misses);
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn fallback_only_serves_from_memory() {
        let cache = CacheCoordinator::fallback_only(CoordinatorConfig::default());
        cache.initialize().await;
        assert_eq!(cache.backend(), Backend::Fallback);

        assert!(cache.set("k", json!({"a": 1}), None).await);
        assert_eq!(cache.get("k").await, Some(json!({"a": 1})));
        assert!(cache.delete("k").await);
        assert_eq!(cache.get("k").await, None);

        let stats = cache.stats().await;
        assert!(stats.initialized);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.deletes, 1);
    }

    #[tokio::test]
    async fn fallback_health_is_healthy() {
        let cache = CacheCoordinator::fallback_only(CoordinatorConfig::default());
        cache.initialize().await;
        let health = cache.health_check().await;
        assert_eq!(health.backend, Backend::Fallback);
        assert!(health.backend_healthy);
    }

    #[tokio::test]
    async fn typed_reads_surface_decode_errors() {
        let cache = CacheCoordinator::fallback_only(CoordinatorConfig::default());
        cache.set("n", json!("not a number"), None).await;
        let result = cache.get_json::<u32>("n").await;
        assert!(matches!(result, Err(CacheError::Serialization(_))));
        assert_eq!(cache.get_json::<u32>("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn disconnect_without_connection_is_noop() {
        let cache = CacheCoordinator::fallback_only(CoordinatorConfig::default());
        cache.initialize().await;
        assert!(cache.disconnect().await.is_ok());
    }
}
