//! Pump from the forwarder queue into the broadcast channel.
//!
//! The change bus forwarder writes into a bounded mpsc queue without
//! waiting. This task drains that queue and re-sends each notification
//! on the [`AppState`] broadcast channel, so the slowest `WebSocket`
//! client only ever lags its own receiver.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use turf_events::Notification;

use crate::state::AppState;

/// Forward every queued notification to connected clients until the
/// queue closes. Returns the number of notifications forwarded.
pub async fn run_fanout(mut rx: mpsc::Receiver<Notification>, state: Arc<AppState>) -> u64 {
    let mut forwarded: u64 = 0;
    while let Some(notification) = rx.recv().await {
        let kind = notification.kind;
        let clients = state.broadcast(notification);
        forwarded = forwarded.saturating_add(1);
        debug!(%kind, clients, "Notification fanned out");
    }
    info!(forwarded, "Notification queue closed, fan-out stopped");
    forwarded
}

/// Spawn [`run_fanout`] on the current runtime.
pub fn spawn_fanout(rx: mpsc::Receiver<Notification>, state: Arc<AppState>) -> JoinHandle<u64> {
    tokio::spawn(run_fanout(rx, state))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use turf_cache::{CacheCoordinator, CoordinatorConfig};
    use turf_events::ChangeKind;

    use super::*;

    fn note(kind: ChangeKind) -> Notification {
        Notification {
            kind,
            data: serde_json::json!({}),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn forwards_in_order_until_closed() {
        let cache = Arc::new(CacheCoordinator::fallback_only(CoordinatorConfig::default()));
        let state = Arc::new(AppState::new(cache, 16));
        let mut client = state.subscribe();
        let (tx, rx) = mpsc::channel(8);
        let handle = spawn_fanout(rx, Arc::clone(&state));

        tx.send(note(ChangeKind::EventCreated)).await.unwrap();
        tx.send(note(ChangeKind::EventExpired)).await.unwrap();
        drop(tx);

        assert_eq!(handle.await.unwrap(), 2);
        assert_eq!(client.recv().await.unwrap().kind, ChangeKind::EventCreated);
        assert_eq!(client.recv().await.unwrap().kind, ChangeKind::EventExpired);
    }

    #[tokio::test]
    async fn no_clients_is_fine() {
        let cache = Arc::new(CacheCoordinator::fallback_only(CoordinatorConfig::default()));
        let state = Arc::new(AppState::new(cache, 4));
        let (tx, rx) = mpsc::channel(4);
        tx.send(note(ChangeKind::PricesUpdated)).await.unwrap();
        drop(tx);
        assert_eq!(run_fanout(rx, state).await, 1);
    }
}
