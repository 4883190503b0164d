//! Synchronous in-process publish/subscribe.
//!
//! Domains publish [`ChangeEvent`]s; subscribers register either for a
//! single [`ChangeKind`] or for everything. Delivery happens on the
//! publisher's thread, in registration order, before `publish` returns.
//! A subscriber is never invoked concurrently with itself because the
//! subscriber list is held for the whole delivery.
//!
//! Subscribers must not publish on the bus that is calling them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::change::{Change, ChangeEvent, ChangeKind};

/// Receives changes from a [`ChangeBus`].
pub trait ChangeSubscriber: Send {
    /// Called once per matching published change.
    fn on_change(&mut self, change: &Change);
}

impl<F> ChangeSubscriber for F
where
    F: FnMut(&Change) + Send,
{
    fn on_change(&mut self, change: &Change) {
        self(change);
    }
}

/// Handle returned by [`ChangeBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    filter: Option<ChangeKind>,
    subscriber: Box<dyn ChangeSubscriber>,
}

/// The in-process change bus shared by every state domain.
pub struct ChangeBus {
    subscriptions: Mutex<Vec<Subscription>>,
    next_id: AtomicU64,
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for ChangeBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChangeBus")
            .field("subscribers", &self.subscriber_count())
            .finish_non_exhaustive()
    }
}

impl ChangeBus {
    /// An empty bus.
    pub const fn new() -> Self {
        Self {
            subscriptions: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register for one event name.
    pub fn subscribe<S>(&self, kind: ChangeKind, subscriber: S) -> SubscriptionId
    where
        S: ChangeSubscriber + 'static,
    {
        self.register(Some(kind), Box::new(subscriber))
    }

    /// Register for every event name.
    pub fn subscribe_all<S>(&self, subscriber: S) -> SubscriptionId
    where
        S: ChangeSubscriber + 'static,
    {
        self.register(None, Box::new(subscriber))
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subs.len();
        subs.retain(|s| s.id != id);
        subs.len() < before
    }

    /// Deliver `event` to every matching subscriber and return how many
    /// received it.
    pub fn publish(&self, event: ChangeEvent, at: DateTime<Utc>) -> usize {
        let change = Change { event, at };
        let kind = change.event.kind();
        let mut subs = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut delivered: usize = 0;
        for sub in subs
            .iter_mut()
            .filter(|s| s.filter.is_none_or(|k| k == kind))
        {
            sub.subscriber.on_change(&change);
            delivered = delivered.saturating_add(1);
        }
        trace!(kind = %kind, delivered, "Change published");
        delivered
    }

    /// Number of registered subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn register(
        &self,
        filter: Option<ChangeKind>,
        subscriber: Box<dyn ChangeSubscriber>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscription {
                id,
                filter,
                subscriber,
            });
        id
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use turf_types::{EconomicIndicators, FactionId, TerritoryId};

    use super::*;
    use crate::change::TerritoryControlChange;

    fn control_change(n: u32) -> ChangeEvent {
        ChangeEvent::TerritoryControlChanged(TerritoryControlChange {
            territory_id: TerritoryId::new(format!("t-{n}")),
            previous_faction: None,
            new_faction: Some(FactionId::from("faction-7")),
        })
    }

    fn indicators() -> ChangeEvent {
        ChangeEvent::EconomicIndicatorsUpdated(EconomicIndicators {
            inflation: rust_decimal::Decimal::new(25, 1),
            unemployment: rust_decimal::Decimal::new(5, 0),
            gross_output: rust_decimal::Decimal::new(100, 0),
            criminal_activity: rust_decimal::Decimal::new(30, 0),
            tourism: rust_decimal::Decimal::new(50, 0),
            business_activity: rust_decimal::Decimal::new(60, 0),
            last_update: Utc::now(),
        })
    }

    #[test]
    fn filtered_subscriber_only_sees_its_kind() {
        let bus = ChangeBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.subscribe(ChangeKind::TerritoryControlChanged, move |c: &Change| {
            sink.lock().unwrap().push(c.event.kind());
        });

        assert_eq!(bus.publish(indicators(), Utc::now()), 0);
        assert_eq!(bus.publish(control_change(1), Utc::now()), 1);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![ChangeKind::TerritoryControlChanged]
        );
    }

    #[test]
    fn delivery_preserves_publish_order() {
        let bus = ChangeBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.subscribe_all(move |c: &Change| {
            if let ChangeEvent::TerritoryControlChanged(t) = &c.event {
                sink.lock().unwrap().push(t.territory_id.to_string());
            }
        });

        for n in 0..5 {
            bus.publish(control_change(n), Utc::now());
        }
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["t-0", "t-1", "t-2", "t-3", "t-4"]
        );
    }

    #[test]
    fn subscribers_run_in_registration_order() {
        let bus = ChangeBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let sink = Arc::clone(&order);
            bus.subscribe_all(move |_: &Change| sink.lock().unwrap().push(tag));
        }
        bus.publish(indicators(), Utc::now());
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = ChangeBus::new();
        let id = bus.subscribe_all(|_: &Change| {});
        assert_eq!(bus.subscriber_count(), 1);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.publish(indicators(), Utc::now()), 0);
    }

    #[test]
    fn struct_subscriber_keeps_state() {
        struct Counter(Arc<AtomicU64>);
        impl ChangeSubscriber for Counter {
            fn on_change(&mut self, _change: &Change) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let bus = ChangeBus::new();
        let count = Arc::new(AtomicU64::new(0));
        bus.subscribe(
            ChangeKind::EconomicIndicatorsUpdated,
            Counter(Arc::clone(&count)),
        );
        bus.publish(indicators(), Utc::now());
        bus.publish(indicators(), Utc::now());
        bus.publish(control_change(0), Utc::now());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
