//! Cache layer for the Turf simulation (`Dragonfly` + in-process fallback).
//!
//! `Dragonfly` is the durable backend that lets a restarted process pick up
//! a recent world snapshot. When it is unreachable the process keeps running
//! on an in-process store; nothing above this crate can tell the difference.
//!
//! # Architecture
//!
//! ```text
//! State domains
//!     |
//!     +-- load_with_default / get / set ---> CacheCoordinator
//!                                                 |
//!                                  Primary-Active +-- DragonflyStore (fred)
//!                                 Fallback-Active +-- MemoryStore
//! ```
//!
//! # Modules
//!
//! - [`store`] -- The `CacheStore` / `DurableStore` contract
//! - [`dragonfly`] -- `Dragonfly` (Redis-compatible) durable store
//! - [`memory`] -- In-process store with per-entry TTL
//! - [`coordinator`] -- Backend selection, demotion, blended surface
//! - [`snapshot`] -- `load_with_default` shared by the state domains
//! - [`error`] -- Shared error types

pub mod coordinator;
pub mod dragonfly;
pub mod error;
pub mod memory;
pub mod snapshot;
pub mod store;

// Re-export primary types for convenience.
pub use coordinator::{Backend, CacheCoordinator, CacheHealth, CacheStats, CoordinatorConfig};
pub use dragonfly::DragonflyStore;
pub use error::CacheError;
pub use memory::MemoryStore;
pub use snapshot::{Loaded, SnapshotSource, load_with_default};
pub use store::{CacheStore, DurableStore};
