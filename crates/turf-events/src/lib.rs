//! Change bus for the Turf simulation.
//!
//! State domains publish typed [`ChangeEvent`]s onto a shared [`ChangeBus`].
//! Subscribers run synchronously in publish order. The [`forward`] module
//! bridges the bus to the real-time observer without ever blocking a
//! publisher.
//!
//! # Modules
//!
//! - [`change`] -- Event names, payloads, and the outbound notification shape
//! - [`bus`] -- Subscription registry and synchronous delivery
//! - [`forward`] -- Fire-and-forget forwarding into a bounded queue

pub mod bus;
pub mod change;
pub mod forward;

pub use bus::{ChangeBus, ChangeSubscriber, SubscriptionId};
pub use change::{Change, ChangeEvent, ChangeKind, Notification, TerritoryControlChange};
pub use forward::{Forwarder, attach_forwarder};
