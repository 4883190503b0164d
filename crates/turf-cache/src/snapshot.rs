//! Load-with-default for domain snapshots.
//!
//! Both state domains boot the same way: read their snapshot through the
//! coordinator, and if it is missing, corrupt, or fails validation, seed
//! built-in defaults and write those back. [`load_with_default`] is that
//! procedure; it never fails.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::coordinator::CacheCoordinator;

/// Where a loaded snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    /// A valid persisted snapshot was found.
    Persisted,
    /// No snapshot existed; defaults were seeded.
    Seeded,
    /// A snapshot existed but was corrupt or invalid; defaults replaced it.
    Recovered,
}

/// A loaded snapshot and its provenance.
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    /// The snapshot value.
    pub value: T,
    /// Where it came from.
    pub source: SnapshotSource,
}

/// Read `key` as `T`, falling back to `default()` on a miss, a decode
/// failure, or a `validate` rejection. Defaults are written back with `ttl`.
pub async fn load_with_default<T, D, V>(
    cache: &CacheCoordinator,
    key: &str,
    ttl: Option<Duration>,
    default: D,
    validate: V,
) -> Loaded<T>
where
    T: Serialize + DeserializeOwned,
    D: FnOnce() -> T,
    V: FnOnce(&T) -> Result<(), String>,
{
    let source = match cache.get_json::<T>(key).await {
        Ok(Some(value)) => match validate(&value) {
            Ok(()) => {
                debug!(key, "Loaded persisted snapshot");
                return Loaded {
                    value,
                    source: SnapshotSource::Persisted,
                };
            }
            Err(reason) => {
                warn!(key, %reason, "Persisted snapshot failed validation, using defaults");
                SnapshotSource::Recovered
            }
        },
        Ok(None) => {
            info!(key, "No persisted snapshot, seeding defaults");
            SnapshotSource::Seeded
        }
        Err(e) => {
            warn!(key, error = %e, "Persisted snapshot is corrupt, using defaults");
            SnapshotSource::Recovered
        }
    };

    let value = default();
    if !cache.set_json(key, &value, ttl).await {
        warn!(key, "Failed to persist default snapshot");
    }
    Loaded { value, source }
}
