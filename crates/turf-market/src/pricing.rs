//! The market pricing model.
//!
//! One tick moves an item's price by
//!
//! ```text
//! delta      = pressure + force
//! pressure   = (demand / max(supply, 1) - 1) * supply_demand_weight
//! force      = (activity + boost) * volatility
//! activity   = (min(recent / average, 2) - 1) * activity_weight   (0 when idle)
//! boost      = event_boost if an active event affects the category, else 0
//! multiplier = 1 + inflation / 100 * inflation_weight
//! next       = max(round2(current * (1 + clamp(delta)) * multiplier), 0.1 * base)
//! ```
//!
//! and the move is only applied when it exceeds `update_threshold` of the
//! previous price. Every weight lives in [`PricingConfig`].

use rust_decimal::Decimal;
use turf_core::PricingConfig;
use turf_types::{ItemCategory, LEVEL_MAX, MarketItem, WorldEventKind};

/// Largest relative move a single tick may apply, either way.
pub const MAX_STEP: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

/// Cap on the `recent / average` volume ratio.
const MAX_VOLUME_RATIO: Decimal = Decimal::TWO;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// The category an active event of `kind` pushes prices up for.
pub const fn boosted_category(kind: WorldEventKind) -> Option<ItemCategory> {
    match kind {
        WorldEventKind::PoliceRaid => Some(ItemCategory::Drugs),
        WorldEventKind::TerritoryConflict | WorldEventKind::FactionWar => {
            Some(ItemCategory::Weapons)
        }
        WorldEventKind::EconomicShift | WorldEventKind::Weather => None,
    }
}

/// `(demand / max(supply, 1) - 1) * weight`.
pub fn supply_demand_pressure(supply: u32, demand: u32, weight: Decimal) -> Decimal {
    let ratio = Decimal::from(demand)
        .checked_div(Decimal::from(supply.max(1)))
        .unwrap_or(Decimal::ONE);
    ratio.saturating_sub(Decimal::ONE).saturating_mul(weight)
}

/// Activity and event force, scaled by the item's volatility.
///
/// An item with no trades in the window contributes no activity term.
pub fn market_force(
    recent_volume: Decimal,
    average_volume: Decimal,
    boosted: bool,
    volatility: Decimal,
    pricing: &PricingConfig,
) -> Decimal {
    let activity = if recent_volume > Decimal::ZERO && average_volume > Decimal::ZERO {
        recent_volume
            .checked_div(average_volume)
            .unwrap_or(Decimal::ONE)
            .min(MAX_VOLUME_RATIO)
            .saturating_sub(Decimal::ONE)
            .saturating_mul(pricing.activity_weight)
    } else {
        Decimal::ZERO
    };
    let boost = if boosted {
        pricing.event_boost
    } else {
        Decimal::ZERO
    };
    activity.saturating_add(boost).saturating_mul(volatility)
}

/// `1 + inflation / 100 * weight`.
pub fn inflation_multiplier(inflation: Decimal, weight: Decimal) -> Decimal {
    let rate = inflation.checked_div(HUNDRED).unwrap_or(Decimal::ZERO);
    Decimal::ONE.saturating_add(rate.saturating_mul(weight))
}

/// Apply `delta` and `multiplier` to the current price, respecting the floor.
pub fn next_price(item: &MarketItem, delta: Decimal, multiplier: Decimal) -> Decimal {
    let step = delta.clamp(Decimal::ZERO.saturating_sub(MAX_STEP), MAX_STEP);
    let raw = item
        .current_price
        .saturating_mul(Decimal::ONE.saturating_add(step))
        .saturating_mul(multiplier)
        .round_dp(2);
    raw.max(item.price_floor())
}

/// Whether `next` differs from `previous` by more than `threshold` of `previous`.
pub fn exceeds_threshold(previous: Decimal, next: Decimal, threshold: Decimal) -> bool {
    let moved = next.saturating_sub(previous).abs();
    moved > previous.abs().saturating_mul(threshold)
}

/// Clamp a level into `0..=100`.
pub fn clamp_level(value: u32) -> u32 {
    value.min(LEVEL_MAX)
}

/// Clamp a percentage-like indicator into `0..=100`.
pub fn clamp_indicator(value: Decimal) -> Decimal {
    value.clamp(Decimal::ZERO, HUNDRED)
}
