//! Error types for the `turf-world` crate.

use turf_types::TerritoryId;

/// Request failures reported by [`TerritoryDomain`](crate::TerritoryDomain).
///
/// Cache and snapshot failures never appear here; they are absorbed by the
/// cache coordinator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// No territory has the given id.
    #[error("territory not found: {0}")]
    TerritoryNotFound(TerritoryId),

    /// The request was malformed.
    #[error("invalid request: {0}")]
    Validation(String),
}

/// Convenience alias for world results.
pub type Result<T> = core::result::Result<T, WorldError>;
