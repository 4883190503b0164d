//! Process-wide plumbing for the Turf simulation.
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration with environment overrides
//! - [`clock`] -- Injected wall clock for deterministic domain time
//! - [`runner`] -- Periodic tick loops and the shared shutdown signal

pub mod clock;
pub mod config;
pub mod runner;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    CacheConfig, ConfigError, MarketConfig, ObserverConfig, PricingConfig, TurfConfig, WorldConfig,
};
pub use runner::{LoopEndReason, LoopResult, Shutdown, run_periodic};
