//! `Dragonfly` (Redis-compatible) durable store.
//!
//! Values are stored as JSON strings. TTLs map onto `SET ... EX`.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `world:territories` | JSON | Territory list snapshot |
//! | `world:events` | JSON | Active world events |
//! | `market:items` | JSON | Market catalog snapshot |
//! | `market:indicators` | JSON | Economic indicator set |
//! | `turf:health` | String | Probe key read by health checks |

use std::time::Duration;

use async_trait::async_trait;
use fred::prelude::*;
use serde_json::Value;

use crate::error::CacheError;
use crate::store::{CacheStore, DurableStore};

/// Key read by [`DragonflyStore::health_check`]. It never needs to exist.
const HEALTH_KEY: &str = "turf:health";

/// Connection handle to a `Dragonfly` (Redis-compatible) instance.
///
/// Wraps a [`fred::prelude::Client`]. The client is built eagerly but does
/// not open a connection until [`DurableStore::connect`] is called.
#[derive(Clone)]
pub struct DragonflyStore {
    client: Client,
}

impl DragonflyStore {
    /// Build a client for the given URL without connecting.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Config`] if the URL cannot be parsed.
    /// Returns [`CacheError::Dragonfly`] if the client cannot be built.
    pub fn from_url(url: &str) -> Result<Self, CacheError> {
        let config = Config::from_url(url)
            .map_err(|e| CacheError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        Ok(Self { client })
    }

    /// Flush all keys from the `Dragonfly` instance.
    ///
    /// **WARNING:** This deletes all data. Only use for testing.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Dragonfly`] if the flush fails.
    pub async fn flush_all(&self) -> Result<(), CacheError> {
        let _: () = self.client.flushall(false).await?;
        Ok(())
    }
}

/// Convert a TTL into a whole-second `EX` expiration, at least one second.
fn expiration(ttl: Duration) -> Expiration {
    let secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX).max(1);
    Expiration::EX(secs)
}

#[async_trait]
impl CacheStore for DragonflyStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let raw: Option<String> = self.client.get(key).await?;
        match raw {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &str,
        value: &Value,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let json = serde_json::to_string(value)?;
        let _: () = self
            .client
            .set(key, json.as_str(), ttl.map(expiration), None, false)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let removed: u32 = self.client.del(key).await?;
        Ok(removed > 0)
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        let _: Option<String> = self.client.get(HEALTH_KEY).await?;
        Ok(())
    }
}

#[async_trait]
impl DurableStore for DragonflyStore {
    async fn connect(&self) -> Result<(), CacheError> {
        self.client.init().await?;
        tracing::info!("Connected to Dragonfly");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), CacheError> {
        self.client.quit().await?;
        tracing::info!("Disconnected from Dragonfly");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiration_rounds_up_to_one_second() {
        assert!(matches!(
            expiration(Duration::from_millis(200)),
            Expiration::EX(1)
        ));
        assert!(matches!(
            expiration(Duration::from_secs(600)),
            Expiration::EX(600)
        ));
    }

    #[test]
    fn invalid_url_is_a_config_error() {
        let result = DragonflyStore::from_url("not a url");
        assert!(matches!(result, Err(CacheError::Config(_))));
    }
}
