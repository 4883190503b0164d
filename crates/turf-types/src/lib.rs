//! Shared type definitions for the Turf live-state simulation.
//!
//! This crate is the single source of truth for the world model shared by
//! the cache layer, the state domains, and the observer. Types flow to
//! `TypeScript` via `ts-rs` for dashboard consumers.
//!
//! # Modules
//!
//! - [`ids`] -- UUID wrappers for generated records, slug wrappers for seeded ones
//! - [`enums`] -- Event kinds, severities, categories, weather
//! - [`structs`] -- Territories, events, indicators, items, transactions, read models

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{
    EconomicClimate, EconomicSignalKind, ItemCategory, PlayerActivityKind, Severity, TimeOfDay,
    TransactionKind, Weather, WorldEventKind,
};
pub use ids::{ActorId, EventId, FactionId, ItemId, PlayerId, TerritoryId, TransactionId};
pub use structs::{
    Boundary, EconomicIndicators, IndicatorsPatch, LEVEL_MAX, Location, MarketItem, MarketStats,
    PriceChange, Territory, Transaction, WorldEvent, WorldSnapshot, WorldStats,
};
