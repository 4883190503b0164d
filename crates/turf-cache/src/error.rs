//! Error types for the cache layer.
//!
//! Store implementations return [`CacheError`]. The
//! [`CacheCoordinator`](crate::CacheCoordinator) absorbs backend failures and
//! never hands them to its callers; only teardown errors from
//! [`CacheCoordinator::disconnect`](crate::CacheCoordinator::disconnect) and
//! snapshot decoding errors from typed reads are surfaced.

/// Errors that can occur in the cache layer.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// A `Dragonfly`/Redis operation failed.
    #[error("Dragonfly error: {0}")]
    Dragonfly(#[from] fred::error::Error),

    /// A stored value could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The durable backend is unreachable or refused the operation.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A backend call did not finish within its deadline.
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        /// The operation that timed out.
        operation: &'static str,
        /// The deadline in milliseconds.
        timeout_ms: u64,
    },

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CacheError {
    /// Whether the error means the backend itself is unhealthy, as opposed
    /// to a bad value or bad configuration.
    pub const fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            Self::Dragonfly(_) | Self::BackendUnavailable(_) | Self::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_failures_are_classified() {
        assert!(CacheError::BackendUnavailable(String::from("down")).is_backend_failure());
        assert!(
            CacheError::Timeout {
                operation: "get",
                timeout_ms: 250
            }
            .is_backend_failure()
        );
        assert!(!CacheError::Config(String::from("bad url")).is_backend_failure());
    }

    #[test]
    fn timeout_message_names_operation() {
        let err = CacheError::Timeout {
            operation: "set",
            timeout_ms: 100,
        };
        assert_eq!(err.to_string(), "set timed out after 100ms");
    }
}
