//! Shared application state for the observer server.
//!
//! [`AppState`] holds the broadcast channel that fans notifications out
//! to every connected `WebSocket` client, plus a handle on the cache
//! coordinator for the health endpoint.

use std::sync::Arc;

use tokio::sync::broadcast;
use turf_cache::CacheCoordinator;
use turf_events::Notification;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Broadcast sender for change notifications.
    pub tx: broadcast::Sender<Notification>,
    /// Cache coordinator probed by `GET /api/health`.
    pub cache: Arc<CacheCoordinator>,
}

impl AppState {
    /// Create a state whose broadcast channel holds `capacity` messages.
    ///
    /// A client that falls further behind than `capacity` skips ahead.
    pub fn new(cache: Arc<CacheCoordinator>, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, cache }
    }

    /// Subscribe to the notification stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// Send a notification to every connected client.
    ///
    /// Returns the number of receivers. Zero is normal when no client is
    /// connected.
    pub fn broadcast(&self, notification: Notification) -> usize {
        self.tx.send(notification).unwrap_or(0)
    }

    /// Number of connected clients.
    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl core::fmt::Debug for AppState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppState")
            .field("clients", &self.tx.receiver_count())
            .finish_non_exhaustive()
    }
}
