//! In-process fallback store.
//!
//! The store of last resort: every operation succeeds. Entries without a
//! TTL live for the lifetime of the process. Expired entries are dropped
//! lazily on read and swept on write.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;

use crate::error::CacheError;
use crate::store::CacheStore;

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: Value,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// A `HashMap`-backed key-value store with per-entry TTL.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, MemoryEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read the value at `key`, dropping it if it has expired.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        let mut entries = self.lock();
        let expired = entries.get(key)?.is_expired(now);
        if expired {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Store `value` at `key`. A TTL too large to represent never expires.
    pub fn set_value(&self, key: &str, value: Value, ttl: Option<Duration>) {
        let now = Instant::now();
        let expires_at = ttl.and_then(|ttl| now.checked_add(ttl));
        let mut entries = self.lock();
        purge_expired(&mut entries, now);
        entries.insert(key.to_owned(), MemoryEntry { value, expires_at });
    }

    /// Remove `key`. Returns whether a live value was removed.
    pub fn remove(&self, key: &str) -> bool {
        let now = Instant::now();
        self.lock()
            .remove(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Number of live (unexpired) entries.
    pub(crate) fn len(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }
}

/// Drop every entry expired at `now`. Returns how many were removed.
fn purge_expired(entries: &mut HashMap<String, MemoryEntry>, now: Instant) -> usize {
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired(now));
    before.saturating_sub(entries.len())
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        Ok(self.get_value(key))
    }

    async fn set(
        &self,
        key: &str,
        value: &Value,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        self.set_value(key, value.clone(), ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.remove(key))
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn set_get_delete() {
        let store = MemoryStore::new();
        store.set_value("a", json!({"n": 1}), None);
        assert_eq!(store.get_value("a"), Some(json!({"n": 1})));
        assert!(store.remove("a"));
        assert!(!store.remove("a"));
        assert_eq!(store.get_value("a"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn ttl_expires_entries() {
        let store = MemoryStore::new();
        store.set_value("short", json!(1), Some(Duration::from_secs(5)));
        store.set_value("forever", json!(2), None);
        assert_eq!(store.len(), 2);

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(store.get_value("short"), Some(json!(1)));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.get_value("short"), None);
        assert_eq!(store.get_value("forever"), Some(json!(2)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn write_sweeps_expired_entries() {
        let store = MemoryStore::new();
        store.set_value("a", json!(1), Some(Duration::from_secs(1)));
        store.set_value("b", json!(2), Some(Duration::from_secs(1)));
        store.set_value("c", json!(3), None);
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.lock().len(), 3);

        store.set_value("d", json!(4), None);
        let entries = store.lock();
        assert_eq!(entries.len(), 2);
        assert!(entries.contains_key("c"));
        assert!(entries.contains_key("d"));
    }

    #[tokio::test]
    async fn trait_surface_never_fails() {
        let store = MemoryStore::new();
        let value = json!(["x", "y"]);
        store.set("k", &value, None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(value));
        assert!(store.delete("k").await.unwrap());
        assert!(store.health_check().await.is_ok());
    }
}
