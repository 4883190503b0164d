//! `WebSocket` handler for the real-time change stream.
//!
//! Clients connect to `GET /ws/changes` and receive every [`Notification`]
//! as a JSON text frame (`{"type", "data", "timestamp"}`). All clients
//! share one broadcast channel; a client that falls behind skips the
//! notifications it missed and resumes from the newest.
//!
//! Each connection keeps a small [`Session`] tally that is logged when the
//! stream ends, so a dropped observer shows how far it got and why it left.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};
use turf_events::Notification;

use crate::state::AppState;

/// Upgrade the request and start streaming notifications.
///
/// # Route
///
/// `GET /ws/changes`
pub async fn ws_changes(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| stream_changes(socket, state))
}

/// Why a change stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ending {
    ClientClosed,
    SendFailed,
    SocketError,
    BusClosed,
}

/// Per-connection delivery tally.
#[derive(Debug, Default)]
struct Session {
    delivered: u64,
    skipped: u64,
    undeliverable: u64,
}

impl Session {
    const fn lagged(&mut self, missed: u64) {
        self.skipped = self.skipped.saturating_add(missed);
    }

    const fn sent(&mut self) {
        self.delivered = self.delivered.saturating_add(1);
    }

    const fn dropped(&mut self) {
        self.undeliverable = self.undeliverable.saturating_add(1);
    }
}

/// Encode a notification as a text frame.
fn encode(notification: &Notification) -> Result<Message, serde_json::Error> {
    serde_json::to_string(notification).map(|json| Message::Text(json.into()))
}

async fn stream_changes(mut socket: WebSocket, state: Arc<AppState>) {
    let mut rx = state.subscribe();
    debug!(clients = state.client_count(), "Change stream opened");
    let mut session = Session::default();

    let ending = loop {
        tokio::select! {
            received = rx.recv() => match received {
                Ok(notification) => {
                    let frame = match encode(&notification) {
                        Ok(frame) => frame,
                        Err(e) => {
                            warn!(kind = %notification.kind, error = %e, "Notification not encodable");
                            session.dropped();
                            continue;
                        }
                    };
                    if socket.send(frame).await.is_err() {
                        break Ending::SendFailed;
                    }
                    session.sent();
                }
                Err(RecvError::Lagged(missed)) => {
                    debug!(missed, "Observer behind the bus, skipping ahead");
                    session.lagged(missed);
                }
                Err(RecvError::Closed) => break Ending::BusClosed,
            },
            inbound = socket.recv() => match inbound {
                Some(Ok(Message::Close(_))) | None => break Ending::ClientClosed,
                Some(Ok(Message::Ping(payload))) => {
                    if socket.send(Message::Pong(payload)).await.is_err() {
                        break Ending::SendFailed;
                    }
                }
                Some(Err(e)) => {
                    debug!(error = %e, "Change stream socket error");
                    break Ending::SocketError;
                }
                // Observers only listen.
                Some(Ok(_)) => {}
            },
        }
    };

    debug!(
        ?ending,
        delivered = session.delivered,
        skipped = session.skipped,
        undeliverable = session.undeliverable,
        "Change stream closed"
    );
}
