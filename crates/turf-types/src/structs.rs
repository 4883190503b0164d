//! Core entity structs for the Turf simulation.
//!
//! Covers territories, world events, economic indicators, market items,
//! transactions, and the read-model views derived from them.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{
    EconomicClimate, ItemCategory, Severity, TimeOfDay, TransactionKind, Weather, WorldEventKind,
};
use crate::ids::{ActorId, EventId, FactionId, ItemId, TerritoryId, TransactionId};

/// Upper bound for supply, demand, and percentage-like indicators.
pub const LEVEL_MAX: u32 = 100;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Axis-aligned rectangle in world coordinates, with an optional height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Boundary {
    /// Minimum x.
    pub x1: f64,
    /// Minimum y.
    pub y1: f64,
    /// Maximum x.
    pub x2: f64,
    /// Maximum y.
    pub y2: f64,
    /// Reference height, if the host reports one.
    pub z: Option<f64>,
}

impl Boundary {
    /// Whether the corners describe a finite rectangle with positive area.
    pub fn is_valid(&self) -> bool {
        [self.x1, self.y1, self.x2, self.y2]
            .iter()
            .all(|v| v.is_finite())
            && self.x1 < self.x2
            && self.y1 < self.y2
    }

    /// Whether the point lies inside the rectangle (edges inclusive).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x1 && x <= self.x2 && y >= self.y1 && y <= self.y2
    }

    /// Whether a circle centred at `(x, y)` touches the rectangle.
    pub fn intersects_circle(&self, x: f64, y: f64, radius: f64) -> bool {
        let nearest_x = x.clamp(self.x1, self.x2);
        let nearest_y = y.clamp(self.y1, self.y2);
        let dx = x - nearest_x;
        let dy = y - nearest_y;
        dx.mul_add(dx, dy * dy) <= radius * radius
    }
}

/// A point in the world with an area of effect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Location {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Optional height.
    pub z: Option<f64>,
    /// Radius of effect in world units.
    pub radius: f64,
}

impl Location {
    /// A location at `(x, y)` with the given radius and no height.
    pub const fn new(x: f64, y: f64, radius: f64) -> Self {
        Self {
            x,
            y,
            z: None,
            radius,
        }
    }

    /// Whether the coordinates are finite and the radius is non-negative.
    pub fn is_valid(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.radius.is_finite() && self.radius >= 0.0
    }
}

// ---------------------------------------------------------------------------
// Territory
// ---------------------------------------------------------------------------

/// A named region of the map that a faction may control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Territory {
    /// Stable identifier.
    pub id: TerritoryId,
    /// Display name.
    pub name: String,
    /// Rectangular extent.
    pub boundary: Boundary,
    /// Faction currently in control, if any.
    pub controlling_faction: Option<FactionId>,
    /// Whether an active conflict overlaps the territory.
    pub contested: bool,
    /// Strategic value of the territory.
    #[ts(as = "String")]
    pub value: Decimal,
    /// When the territory last changed.
    pub last_update: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// World events
// ---------------------------------------------------------------------------

/// A time-boxed happening in the world.
///
/// An event is active from creation until `expires_at`. Expiry is terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WorldEvent {
    /// Unique identifier.
    pub id: EventId,
    /// What kind of event this is.
    pub kind: WorldEventKind,
    /// Where it happens.
    pub location: Location,
    /// How disruptive it is.
    pub severity: Severity,
    /// Lifetime in minutes.
    pub duration_minutes: u32,
    /// Factions involved.
    pub affected_factions: Vec<FactionId>,
    /// Human-readable summary.
    pub description: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// `created_at + duration_minutes`.
    pub expires_at: DateTime<Utc>,
}

impl WorldEvent {
    /// Create an event starting at `now` with `expires_at` derived from the duration.
    pub fn new(
        kind: WorldEventKind,
        location: Location,
        severity: Severity,
        duration_minutes: u32,
        affected_factions: Vec<FactionId>,
        description: String,
        now: DateTime<Utc>,
    ) -> Self {
        let expires_at = now
            .checked_add_signed(TimeDelta::minutes(i64::from(duration_minutes)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            id: EventId::new(),
            kind,
            location,
            severity,
            duration_minutes,
            affected_factions,
            description,
            created_at: now,
            expires_at,
        }
    }

    /// Whether the event is still active at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Whether the given faction is listed as affected.
    pub fn involves(&self, faction: &FactionId) -> bool {
        self.affected_factions.contains(faction)
    }
}

// ---------------------------------------------------------------------------
// Economy
// ---------------------------------------------------------------------------

/// City-wide economic indicators. Percentage-like fields are kept in `0..=100`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EconomicIndicators {
    /// Annualised inflation, percent.
    #[ts(as = "String")]
    pub inflation: Decimal,
    /// Unemployment, percent.
    #[ts(as = "String")]
    pub unemployment: Decimal,
    /// Gross output index.
    #[ts(as = "String")]
    pub gross_output: Decimal,
    /// Criminal activity index, percent.
    #[ts(as = "String")]
    pub criminal_activity: Decimal,
    /// Tourism index, percent.
    #[ts(as = "String")]
    pub tourism: Decimal,
    /// Business activity index, percent.
    #[ts(as = "String")]
    pub business_activity: Decimal,
    /// When any field last changed.
    pub last_update: DateTime<Utc>,
}

/// Partial update for [`EconomicIndicators`]. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct IndicatorsPatch {
    /// New inflation.
    #[ts(as = "Option<String>")]
    pub inflation: Option<Decimal>,
    /// New unemployment.
    #[ts(as = "Option<String>")]
    pub unemployment: Option<Decimal>,
    /// New gross output.
    #[ts(as = "Option<String>")]
    pub gross_output: Option<Decimal>,
    /// New criminal activity.
    #[ts(as = "Option<String>")]
    pub criminal_activity: Option<Decimal>,
    /// New tourism.
    #[ts(as = "Option<String>")]
    pub tourism: Option<Decimal>,
    /// New business activity.
    #[ts(as = "Option<String>")]
    pub business_activity: Option<Decimal>,
}

impl IndicatorsPatch {
    /// Whether the patch changes nothing.
    pub const fn is_empty(&self) -> bool {
        self.inflation.is_none()
            && self.unemployment.is_none()
            && self.gross_output.is_none()
            && self.criminal_activity.is_none()
            && self.tourism.is_none()
            && self.business_activity.is_none()
    }
}

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

/// A tradable good or service.
///
/// `current_price` never drops below [`MarketItem::price_floor`], and
/// `supply`/`demand` stay within `0..=100`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MarketItem {
    /// Stable identifier.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Category.
    pub category: ItemCategory,
    /// Immutable reference price.
    #[ts(as = "String")]
    pub base_price: Decimal,
    /// Price quoted to buyers.
    #[ts(as = "String")]
    pub current_price: Decimal,
    /// Available stock, `0..=100`.
    pub supply: u32,
    /// Buyer interest, `0..=100`.
    pub demand: u32,
    /// Sensitivity to market forces, `0..=1`.
    #[ts(as = "String")]
    pub volatility: Decimal,
    /// Historical average units traded per hour.
    #[ts(as = "String")]
    pub average_volume: Decimal,
    /// When the item last changed.
    pub last_update: DateTime<Utc>,
}

impl MarketItem {
    /// The hard minimum price: 10% of the base price.
    pub fn price_floor(&self) -> Decimal {
        self.base_price
            .checked_mul(Decimal::new(1, 1))
            .unwrap_or(Decimal::ZERO)
    }

    /// Whether price and level invariants hold.
    pub fn is_consistent(&self) -> bool {
        self.base_price > Decimal::ZERO
            && self.current_price >= self.price_floor()
            && self.supply <= LEVEL_MAX
            && self.demand <= LEVEL_MAX
            && self.volatility >= Decimal::ZERO
            && self.volatility <= Decimal::ONE
    }
}

/// An immutable audit record of balance-affecting activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Transaction {
    /// Unique identifier.
    pub id: TransactionId,
    /// What happened.
    pub kind: TransactionKind,
    /// Whose balance changed.
    pub actor_id: ActorId,
    /// Item traded, if any.
    pub item_id: Option<ItemId>,
    /// Total amount moved.
    #[ts(as = "String")]
    pub amount: Decimal,
    /// Human-readable summary.
    pub description: String,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
    /// Free-form details (quantity, unit price, ...).
    pub metadata: serde_json::Value,
}

/// A single item's price movement within one market tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PriceChange {
    /// The item that moved.
    pub item_id: ItemId,
    /// Price before the tick.
    #[ts(as = "String")]
    pub previous_price: Decimal,
    /// Price after the tick.
    #[ts(as = "String")]
    pub new_price: Decimal,
}

// ---------------------------------------------------------------------------
// Read models
// ---------------------------------------------------------------------------

/// Materialized world view for external read models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WorldSnapshot {
    /// Players seen within the activity window.
    pub active_players: u32,
    /// Weather derived from the clock.
    pub weather: Weather,
    /// Segment of the day derived from the clock.
    pub time_of_day: TimeOfDay,
    /// Aggregate economic classification.
    pub economic_climate: EconomicClimate,
    /// Number of active events.
    pub active_events: u32,
    /// Number of contested territories.
    pub contested_territories: u32,
    /// When the view was built.
    pub generated_at: DateTime<Utc>,
}

/// Aggregate territory/event statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WorldStats {
    /// Number of territories.
    pub territories: u32,
    /// Territories with a controlling faction.
    pub controlled: u32,
    /// Territories flagged contested.
    pub contested: u32,
    /// Active events by kind.
    pub active_events_by_kind: BTreeMap<WorldEventKind, u32>,
}

/// Aggregate market statistics derived from in-memory state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MarketStats {
    /// Number of catalog items.
    pub item_count: u32,
    /// Mean current price across all items.
    #[ts(as = "String")]
    pub average_price: Decimal,
    /// Sum of transaction amounts in the last 24 hours.
    #[ts(as = "String")]
    pub volume_24h: Decimal,
    /// Number of transactions in the last 24 hours.
    pub transactions_24h: u32,
    /// `volume_24h / transactions_24h`, zero when idle.
    #[ts(as = "String")]
    pub average_transaction_size: Decimal,
}
