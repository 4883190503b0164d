//! Non-blocking bridge from the bus to outward-facing observers.
//!
//! The forwarder converts each change into a [`Notification`] and hands it
//! to a bounded channel with `try_send`. A full or closed channel drops the
//! notification and logs; the publisher never waits on observer I/O.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::bus::{ChangeBus, ChangeSubscriber, SubscriptionId};
use crate::change::{Change, Notification};

/// Bus subscriber that forwards notifications into an mpsc channel.
#[derive(Debug)]
pub struct Forwarder {
    tx: mpsc::Sender<Notification>,
    dropped: u64,
}

impl Forwarder {
    /// Wrap an existing channel sender.
    pub const fn new(tx: mpsc::Sender<Notification>) -> Self {
        Self { tx, dropped: 0 }
    }
}

impl ChangeSubscriber for Forwarder {
    fn on_change(&mut self, change: &Change) {
        let notification = match change.to_notification() {
            Ok(n) => n,
            Err(e) => {
                warn!(kind = %change.event.kind(), error = %e, "Failed to encode notification");
                return;
            }
        };
        match self.tx.try_send(notification) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(n)) => {
                self.dropped = self.dropped.saturating_add(1);
                warn!(
                    kind = %n.kind,
                    dropped = self.dropped,
                    "Observer queue full, dropping notification"
                );
            }
            Err(mpsc::error::TrySendError::Closed(n)) => {
                debug!(kind = %n.kind, "Observer queue closed, dropping notification");
            }
        }
    }
}

/// Subscribe a [`Forwarder`] to every change on `bus` and return the
/// receiving end of its queue.
pub fn attach_forwarder(
    bus: &ChangeBus,
    capacity: usize,
) -> (SubscriptionId, mpsc::Receiver<Notification>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let id = bus.subscribe_all(Forwarder::new(tx));
    (id, rx)
}
