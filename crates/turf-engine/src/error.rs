//! Error types for the engine binary.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error so `main` can propagate
/// with `?`. Domain and cache failures during normal operation are
/// absorbed below this level; only startup and teardown reach here.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: turf_core::ConfigError,
    },

    /// Tearing down the durable store connection failed.
    #[error("cache error: {source}")]
    Cache {
        /// The underlying cache error.
        #[from]
        source: turf_cache::CacheError,
    },

    /// Waiting for the shutdown signal failed.
    #[error("signal error: {source}")]
    Signal {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A background task panicked or was cancelled.
    #[error("task {name} failed: {message}")]
    Task {
        /// Task name.
        name: &'static str,
        /// Join failure description.
        message: String,
    },
}
