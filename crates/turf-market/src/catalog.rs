//! Built-in item catalog and indicator set seeded on first boot.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use turf_types::{EconomicIndicators, ItemCategory, ItemId, LEVEL_MAX, MarketItem};

/// Static description of a catalog entry.
struct Seed {
    id: &'static str,
    name: &'static str,
    category: ItemCategory,
    base_price: i64,
    supply: u32,
    demand: u32,
    /// Hundredths.
    volatility: i64,
    /// Tenths of a unit per hour.
    average_volume: i64,
}

const SEEDS: &[Seed] = &[
    Seed {
        id: "weed",
        name: "Weed",
        category: ItemCategory::Drugs,
        base_price: 50,
        supply: 60,
        demand: 55,
        volatility: 40,
        average_volume: 200,
    },
    Seed {
        id: "cocaine",
        name: "Cocaine",
        category: ItemCategory::Drugs,
        base_price: 250,
        supply: 40,
        demand: 60,
        volatility: 60,
        average_volume: 80,
    },
    Seed {
        id: "pistol",
        name: "Pistol",
        category: ItemCategory::Weapons,
        base_price: 500,
        supply: 50,
        demand: 50,
        volatility: 30,
        average_volume: 50,
    },
    Seed {
        id: "assault-rifle",
        name: "Assault Rifle",
        category: ItemCategory::Weapons,
        base_price: 2_500,
        supply: 30,
        demand: 45,
        volatility: 50,
        average_volume: 20,
    },
    Seed {
        id: "sedan",
        name: "Sedan",
        category: ItemCategory::Vehicles,
        base_price: 15_000,
        supply: 50,
        demand: 40,
        volatility: 20,
        average_volume: 10,
    },
    Seed {
        id: "sports-car",
        name: "Sports Car",
        category: ItemCategory::Vehicles,
        base_price: 85_000,
        supply: 25,
        demand: 35,
        volatility: 30,
        average_volume: 5,
    },
    Seed {
        id: "getaway-driver",
        name: "Getaway Driver",
        category: ItemCategory::Services,
        base_price: 1_200,
        supply: 40,
        demand: 45,
        volatility: 25,
        average_volume: 30,
    },
    Seed {
        id: "money-laundering",
        name: "Money Laundering",
        category: ItemCategory::Services,
        base_price: 5_000,
        supply: 35,
        demand: 50,
        volatility: 35,
        average_volume: 20,
    },
    Seed {
        id: "safehouse",
        name: "Safehouse",
        category: ItemCategory::Property,
        base_price: 120_000,
        supply: 20,
        demand: 30,
        volatility: 10,
        average_volume: 2,
    },
    Seed {
        id: "nightclub",
        name: "Nightclub",
        category: ItemCategory::Property,
        base_price: 450_000,
        supply: 20,
        demand: 25,
        volatility: 15,
        average_volume: 1,
    },
];

/// The default catalog, priced at base and stamped with `now`.
pub fn default_items(now: DateTime<Utc>) -> Vec<MarketItem> {
    SEEDS
        .iter()
        .map(|s| MarketItem {
            id: ItemId::from(s.id),
            name: s.name.to_owned(),
            category: s.category,
            base_price: Decimal::new(s.base_price, 0),
            current_price: Decimal::new(s.base_price, 0),
            supply: s.supply,
            demand: s.demand,
            volatility: Decimal::new(s.volatility, 2),
            average_volume: Decimal::new(s.average_volume, 1),
            last_update: now,
        })
        .collect()
}

/// The default indicator set, stamped with `now`.
pub fn default_indicators(now: DateTime<Utc>) -> EconomicIndicators {
    EconomicIndicators {
        inflation: Decimal::new(25, 1),
        unemployment: Decimal::new(5, 0),
        gross_output: Decimal::new(65, 0),
        criminal_activity: Decimal::new(40, 0),
        tourism: Decimal::new(50, 0),
        business_activity: Decimal::new(60, 0),
        last_update: now,
    }
}

/// Check a loaded catalog: non-empty, unique ids, every item consistent.
pub fn validate_items(items: &[MarketItem]) -> Result<(), String> {
    if items.is_empty() {
        return Err(String::from("item catalog is empty"));
    }
    for (i, item) in items.iter().enumerate() {
        if !item.is_consistent() {
            return Err(format!("item {} violates price or level bounds", item.id));
        }
        if items.iter().skip(i.saturating_add(1)).any(|o| o.id == item.id) {
            return Err(format!("duplicate item id {}", item.id));
        }
    }
    Ok(())
}

/// Check a loaded indicator set: every field within `0..=100`.
pub fn validate_indicators(indicators: &EconomicIndicators) -> Result<(), String> {
    let max = Decimal::from(LEVEL_MAX);
    let fields = [
        ("inflation", indicators.inflation),
        ("unemployment", indicators.unemployment),
        ("gross_output", indicators.gross_output),
        ("criminal_activity", indicators.criminal_activity),
        ("tourism", indicators.tourism),
        ("business_activity", indicators.business_activity),
    ];
    match fields
        .iter()
        .find(|(_, v)| *v < Decimal::ZERO || *v > max)
    {
        Some((name, value)) => Err(format!("indicator {name} out of range: {value}")),
        None => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn catalog_covers_every_category() {
        let items = default_items(Utc::now());
        assert_eq!(items.len(), 10);
        assert!(validate_items(&items).is_ok());
        for category in [
            ItemCategory::Drugs,
            ItemCategory::Weapons,
            ItemCategory::Vehicles,
            ItemCategory::Services,
            ItemCategory::Property,
        ] {
            assert!(items.iter().any(|i| i.category == category), "{category:?}");
        }
    }

    #[test]
    fn items_start_at_base_price() {
        for item in default_items(Utc::now()) {
            assert_eq!(item.current_price, item.base_price, "{}", item.id);
        }
    }

    #[test]
    fn broken_catalog_rejected() {
        let mut items = default_items(Utc::now());
        items[0].current_price = Decimal::ONE;
        assert!(validate_items(&items).is_err());

        let mut dupes = default_items(Utc::now());
        dupes[1].id = dupes[0].id.clone();
        assert!(validate_items(&dupes).is_err());

        assert!(validate_items(&[]).is_err());
    }

    #[test]
    fn indicator_bounds() {
        let mut indicators = default_indicators(Utc::now());
        assert!(validate_indicators(&indicators).is_ok());
        indicators.tourism = Decimal::new(101, 0);
        let err = validate_indicators(&indicators).unwrap_err();
        assert!(err.contains("tourism"));
    }
}
