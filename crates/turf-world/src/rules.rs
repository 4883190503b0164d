//! Event synthesis rules.
//!
//! Each recorded signal maps to a fixed event kind, duration, and
//! severity. These functions are pure; the domain supplies location,
//! factions, and the clock.
//!
//! | Trigger                          | Kind              | Minutes | Severity      |
//! |----------------------------------|-------------------|---------|---------------|
//! | Faction conflict                 | TerritoryConflict | 30      | High          |
//! | Conflict between warring pair    | FactionWar        | 60      | Critical      |
//! | Drug deal, robbery               | PoliceRaid        | 20      | High          |
//! | Shootout                         | TerritoryConflict | 30      | High          |
//! | Economic signal                  | EconomicShift     | 120     | by magnitude  |
//! | Storm or fog (world tick)        | Weather           | 60      | Medium / Low  |

use rust_decimal::Decimal;
use turf_types::{EconomicSignalKind, PlayerActivityKind, Severity, Weather, WorldEventKind};

/// Kind, lifetime, and severity of an event about to be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRule {
    /// Event kind.
    pub kind: WorldEventKind,
    /// Lifetime in minutes.
    pub duration_minutes: u32,
    /// Severity tier.
    pub severity: Severity,
}

const TERRITORY_CONFLICT: EventRule = EventRule {
    kind: WorldEventKind::TerritoryConflict,
    duration_minutes: 30,
    severity: Severity::High,
};

const FACTION_WAR: EventRule = EventRule {
    kind: WorldEventKind::FactionWar,
    duration_minutes: 60,
    severity: Severity::Critical,
};

const POLICE_RAID: EventRule = EventRule {
    kind: WorldEventKind::PoliceRaid,
    duration_minutes: 20,
    severity: Severity::High,
};

/// Lifetime of an economic shift.
pub const ECONOMIC_SHIFT_MINUTES: u32 = 120;

/// Lifetime of a weather event.
pub const WEATHER_MINUTES: u32 = 60;

/// Rule for a conflict between two factions. `escalate` is set when the
/// pair already has an active territory conflict.
pub const fn faction_conflict(escalate: bool) -> EventRule {
    if escalate { FACTION_WAR } else { TERRITORY_CONFLICT }
}

/// Rule for a player activity, or `None` if it raises no event.
pub const fn player_activity(kind: PlayerActivityKind) -> Option<EventRule> {
    match kind {
        PlayerActivityKind::DrugDeal | PlayerActivityKind::Robbery => Some(POLICE_RAID),
        PlayerActivityKind::Shootout => Some(TERRITORY_CONFLICT),
        PlayerActivityKind::Trade | PlayerActivityKind::Travel => None,
    }
}

/// Severity of an economic shift: `|m| > 2` high, `|m| > 1` medium, else low.
pub fn economic_severity(magnitude: Decimal) -> Severity {
    let m = magnitude.abs();
    if m > Decimal::TWO {
        Severity::High
    } else if m > Decimal::ONE {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Rule for an economic signal of the given magnitude.
pub fn economic_signal(magnitude: Decimal) -> EventRule {
    EventRule {
        kind: WorldEventKind::EconomicShift,
        duration_minutes: ECONOMIC_SHIFT_MINUTES,
        severity: economic_severity(magnitude),
    }
}

/// Rule for the current weather, or `None` if it is unremarkable.
pub const fn weather(weather: Weather) -> Option<EventRule> {
    let severity = match weather {
        Weather::Storm => Severity::Medium,
        Weather::Fog => Severity::Low,
        _ => return None,
    };
    Some(EventRule {
        kind: WorldEventKind::Weather,
        duration_minutes: WEATHER_MINUTES,
        severity,
    })
}

/// Signed contribution of one economic signal to the city climate score.
///
/// Booms push the score up by `|m|`; recessions pull it down by `|m|`;
/// inflation and crackdowns pull it down by half.
pub fn climate_score(kind: EconomicSignalKind, magnitude: Decimal) -> Decimal {
    let m = magnitude.abs();
    let half = m.checked_div(Decimal::TWO).unwrap_or(Decimal::ZERO);
    match kind {
        EconomicSignalKind::Boom => m,
        EconomicSignalKind::Recession => Decimal::ZERO.saturating_sub(m),
        EconomicSignalKind::Inflation | EconomicSignalKind::Crackdown => {
            Decimal::ZERO.saturating_sub(half)
        }
    }
}

/// Human-readable label used in event descriptions.
pub const fn activity_label(kind: PlayerActivityKind) -> &'static str {
    match kind {
        PlayerActivityKind::DrugDeal => "drug deal",
        PlayerActivityKind::Robbery => "robbery",
        PlayerActivityKind::Shootout => "shootout",
        PlayerActivityKind::Trade => "trade",
        PlayerActivityKind::Travel => "travel",
    }
}

/// Human-readable label used in event descriptions.
pub const fn signal_label(kind: EconomicSignalKind) -> &'static str {
    match kind {
        EconomicSignalKind::Boom => "boom",
        EconomicSignalKind::Recession => "recession",
        EconomicSignalKind::Inflation => "inflation",
        EconomicSignalKind::Crackdown => "crackdown",
    }
}
