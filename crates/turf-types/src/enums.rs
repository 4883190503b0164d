//! Enumeration types for the Turf simulation.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// World events
// ---------------------------------------------------------------------------

/// The kind of a [`WorldEvent`](crate::WorldEvent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum WorldEventKind {
    /// Two factions fighting over ground.
    TerritoryConflict,
    /// A macro-economic change (boom, recession, inflation spike).
    EconomicShift,
    /// Law enforcement sweeping an area.
    PoliceRaid,
    /// A notable weather front.
    Weather,
    /// A sustained conflict between two factions.
    FactionWar,
}

/// Severity tier of a world event. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Severity {
    /// Background noise.
    Low,
    /// Noticeable.
    Medium,
    /// Disruptive.
    High,
    /// City-wide.
    Critical,
}

// ---------------------------------------------------------------------------
// Inputs recorded by collaborators
// ---------------------------------------------------------------------------

/// A player activity reported by the game host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum PlayerActivityKind {
    /// A street-level drug sale.
    DrugDeal,
    /// A robbery of a store or player.
    Robbery,
    /// An exchange of gunfire.
    Shootout,
    /// A legitimate trade.
    Trade,
    /// Moving around the map.
    Travel,
}

/// The direction of an economic signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum EconomicSignalKind {
    /// Output and spending are rising.
    Boom,
    /// Output and spending are falling.
    Recession,
    /// Prices are rising faster than usual.
    Inflation,
    /// Authorities are tightening enforcement on illicit trade.
    Crackdown,
}

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

/// Category of a market item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum ItemCategory {
    /// Narcotics.
    Drugs,
    /// Firearms and ammunition.
    Weapons,
    /// Cars and bikes.
    Vehicles,
    /// Hired services.
    Services,
    /// Real estate.
    Property,
}

/// Kind of a ledger-affecting [`Transaction`](crate::Transaction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum TransactionKind {
    /// Actor bought from the market.
    Purchase,
    /// Actor sold to the market.
    Sale,
    /// Balance moved between actors.
    Transfer,
    /// Balance credited from outside the market.
    Income,
    /// Balance debited outside the market.
    Expense,
}

// ---------------------------------------------------------------------------
// Environment and read models
// ---------------------------------------------------------------------------

/// Weather derived from the wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Weather {
    /// Clear skies.
    Clear,
    /// Overcast.
    Cloudy,
    /// Rain showers.
    Rain,
    /// Thunderstorm.
    Storm,
    /// Low visibility.
    Fog,
    /// Hot and dry.
    Heatwave,
    /// Snowfall.
    Snow,
}

/// Segment of the day derived from the wall-clock hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum TimeOfDay {
    /// 05:00 to 07:59.
    Dawn,
    /// 08:00 to 17:59.
    Day,
    /// 18:00 to 20:59.
    Dusk,
    /// 21:00 to 04:59.
    Night,
}

/// Aggregate classification of the current economy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum EconomicClimate {
    /// Net positive pressure.
    Booming,
    /// No significant pressure.
    Stable,
    /// Mild negative pressure.
    Strained,
    /// Strong negative pressure.
    Recession,
}
