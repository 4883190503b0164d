//! Territory and world-event domain for the Turf simulation.
//!
//! The domain keeps the authoritative territory set and active world
//! events in memory, writes snapshots through the cache coordinator, and
//! publishes every change on the change bus.
//!
//! # Modules
//!
//! - [`domain`] -- [`TerritoryDomain`]: mutations, periodic tick, read models
//! - [`error`] -- Request failures
//! - [`rules`] -- Fixed duration and severity per synthesized event
//! - [`starting_territories`] -- The five districts seeded on first boot
//! - [`weather`] -- Deterministic weather and time of day from the clock

pub mod domain;
pub mod error;
pub mod rules;
pub mod starting_territories;
pub mod weather;

pub use domain::{
    EVENTS_KEY, EventFilter, TERRITORIES_KEY, TerritoryDomain, WorldSettings, WorldTickReport,
};
pub use error::WorldError;
