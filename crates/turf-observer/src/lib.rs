//! Real-time observer server for the Turf simulation.
//!
//! This crate is the outward-facing end of the change bus:
//!
//! - **`WebSocket` endpoint** (`/ws/changes`) streaming every change
//!   notification to connected clients via [`tokio::sync::broadcast`]
//! - **Health endpoint** (`/api/health`) reporting which cache backend is
//!   active and whether it answers
//!
//! # Architecture
//!
//! ```text
//! ChangeBus --Forwarder(try_send)--> mpsc queue --fanout task--> broadcast --> clients
//! ```
//!
//! The domains never wait on this crate: the forwarder drops on a full
//! queue, and each client lags only its own broadcast receiver.

pub mod fanout;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use fanout::{run_fanout, spawn_fanout};
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
