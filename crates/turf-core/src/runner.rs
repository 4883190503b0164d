//! Periodic tick loop with cooperative shutdown.
//!
//! Each state domain recomputes on a fixed interval. [`run_periodic`]
//! drives one such loop: it sleeps for the interval, runs the tick to
//! completion, and repeats until the shared [`Shutdown`] fires. A tick in
//! progress is never interrupted; shutdown is observed between ticks.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Why a periodic loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEndReason {
    /// [`Shutdown::trigger`] was called.
    ShutdownRequested,
    /// Every [`Shutdown`] handle was dropped.
    ShutdownDropped,
}

/// Result of a finished periodic loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopResult {
    /// Loop name, for logging.
    pub name: &'static str,
    /// Number of ticks that completed.
    pub total_ticks: u64,
    /// Why the loop ended.
    pub end_reason: LoopEndReason,
}

/// Broadcast shutdown flag shared by every periodic loop.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    /// A fresh, untriggered signal.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// A receiver for a loop to watch.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Ask every loop to stop after its current tick.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Whether [`Shutdown::trigger`] has been called.
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Run `tick` every `interval` until shutdown.
///
/// The first tick runs one full interval after the call. If a tick
/// overruns the interval, the next one is delayed rather than bunched.
pub async fn run_periodic<F, Fut>(
    name: &'static str,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut tick: F,
) -> LoopResult
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let period = interval.max(Duration::from_millis(1));
    let now = tokio::time::Instant::now();
    let start = now.checked_add(period).unwrap_or(now);
    let mut timer = tokio::time::interval_at(start, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut total_ticks: u64 = 0;

    info!(name, interval = ?period, "Periodic loop starting");

    let end_reason = loop {
        if *shutdown.borrow_and_update() {
            break LoopEndReason::ShutdownRequested;
        }
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break LoopEndReason::ShutdownDropped;
                }
            }
            _ = timer.tick() => {
                tick().await;
                total_ticks = total_ticks.saturating_add(1);
                debug!(name, total_ticks, "Periodic tick complete");
            }
        }
    };

    info!(name, total_ticks, reason = ?end_reason, "Periodic loop stopped");
    LoopResult {
        name,
        total_ticks,
        end_reason,
    }
}
