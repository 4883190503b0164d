//! The key-value contract shared by every cache backend.
//!
//! Values are structured [`serde_json::Value`]s; backends serialize them
//! transparently. A TTL is advisory but binding on reads: once it has
//! elapsed, `get` must report the key as absent.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::CacheError;

/// Uniform get/set/delete/health contract over a key-value store.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read the value at `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    /// Store `value` at `key`, expiring after `ttl` when given.
    async fn set(&self, key: &str, value: &Value, ttl: Option<Duration>)
    -> Result<(), CacheError>;

    /// Remove `key`. Returns whether a value was removed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Probe the backend. `Ok(())` means it is serving requests.
    async fn health_check(&self) -> Result<(), CacheError>;
}

/// A remote store with an explicit connection lifecycle.
#[async_trait]
pub trait DurableStore: CacheStore {
    /// Open the connection.
    async fn connect(&self) -> Result<(), CacheError>;

    /// Close the connection.
    async fn disconnect(&self) -> Result<(), CacheError>;
}
