//! Built-in territory set seeded on first boot.
//!
//! Five unclaimed districts laid out on a 2x3 grid around the map origin.
//! Boundaries do not overlap, so every point maps to at most one territory.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use turf_types::{Boundary, Territory, TerritoryId};

/// Helper to build an unclaimed [`Territory`].
fn territory(
    id: &str,
    name: &str,
    (x1, y1, x2, y2): (f64, f64, f64, f64),
    value: i64,
    now: DateTime<Utc>,
) -> Territory {
    Territory {
        id: TerritoryId::from(id),
        name: name.to_owned(),
        boundary: Boundary {
            x1,
            y1,
            x2,
            y2,
            z: None,
        },
        controlling_faction: None,
        contested: false,
        value: Decimal::new(value, 0),
        last_update: now,
    }
}

/// The default territories, stamped with `now`.
pub fn default_territories(now: DateTime<Utc>) -> Vec<Territory> {
    vec![
        territory("downtown", "Downtown", (-500.0, 0.0, 500.0, 1000.0), 50_000, now),
        territory("docks", "The Docks", (-1500.0, -1000.0, -500.0, 0.0), 35_000, now),
        territory(
            "industrial",
            "Industrial District",
            (-500.0, -1000.0, 500.0, 0.0),
            30_000,
            now,
        ),
        territory("hillside", "Hillside", (500.0, 0.0, 1500.0, 1000.0), 40_000, now),
        territory("old-town", "Old Town", (500.0, -1000.0, 1500.0, 0.0), 25_000, now),
    ]
}

/// Check a loaded territory set: non-empty, unique ids, valid boundaries.
pub fn validate_territories(territories: &[Territory]) -> Result<(), String> {
    if territories.is_empty() {
        return Err(String::from("territory set is empty"));
    }
    for (i, t) in territories.iter().enumerate() {
        if !t.boundary.is_valid() {
            return Err(format!("territory {} has a degenerate boundary", t.id));
        }
        if territories.iter().skip(i.saturating_add(1)).any(|o| o.id == t.id) {
            return Err(format!("duplicate territory id {}", t.id));
        }
    }
    Ok(())
}
