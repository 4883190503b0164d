//! Deterministic weather and time of day.
//!
//! Weather is a pure function of the wall-clock hour: the month selects a
//! seasonal weight table and an `xorshift64` roll seeded from the
//! `(year, day-of-year, hour)` triple picks an entry. The same hour always
//! yields the same weather, which keeps snapshots and the world tick
//! reproducible under an injected clock.
//!
//! | Weather  | Winter | Spring | Summer | Autumn |
//! |----------|--------|--------|--------|--------|
//! | Clear    | 25%    | 35%    | 45%    | 30%    |
//! | Cloudy   | 20%    | 25%    | 15%    | 25%    |
//! | Rain     | 10%    | 20%    | 10%    | 20%    |
//! | Storm    | 10%    | 10%    | 10%    | 10%    |
//! | Fog      | 15%    | 10%    |  0%    | 15%    |
//! | Heatwave |  0%    |  0%    | 20%    |  0%    |
//! | Snow     | 20%    |  0%    |  0%    |  0%    |

use chrono::{DateTime, Datelike, Timelike, Utc};
use turf_types::{TimeOfDay, Weather};

/// Calendar season, derived from the month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    /// December to February.
    Winter,
    /// March to May.
    Spring,
    /// June to August.
    Summer,
    /// September to November.
    Autumn,
}

impl Season {
    /// The season containing `month` (1-12).
    pub const fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Self::Spring,
            6..=8 => Self::Summer,
            9..=11 => Self::Autumn,
            _ => Self::Winter,
        }
    }

    const fn weights(self) -> &'static [(Weather, u32)] {
        match self {
            Self::Winter => &[
                (Weather::Clear, 25),
                (Weather::Cloudy, 20),
                (Weather::Rain, 10),
                (Weather::Storm, 10),
                (Weather::Fog, 15),
                (Weather::Snow, 20),
            ],
            Self::Spring => &[
                (Weather::Clear, 35),
                (Weather::Cloudy, 25),
                (Weather::Rain, 20),
                (Weather::Storm, 10),
                (Weather::Fog, 10),
            ],
            Self::Summer => &[
                (Weather::Clear, 45),
                (Weather::Cloudy, 15),
                (Weather::Rain, 10),
                (Weather::Storm, 10),
                (Weather::Heatwave, 20),
            ],
            Self::Autumn => &[
                (Weather::Clear, 30),
                (Weather::Cloudy, 25),
                (Weather::Rain, 20),
                (Weather::Storm, 10),
                (Weather::Fog, 15),
            ],
        }
    }
}

/// Weather for the hour containing `at`.
pub fn weather_at(at: DateTime<Utc>) -> Weather {
    let table = Season::from_month(at.month()).weights();
    let total: u32 = table.iter().fold(0_u32, |acc, (_, w)| acc.saturating_add(*w));
    if total == 0 {
        return Weather::Clear;
    }

    let year = u64::from(at.year().unsigned_abs());
    let hour_of_year = u64::from(at.ordinal())
        .saturating_mul(24)
        .saturating_add(u64::from(at.hour()));
    let roll = deterministic_random(year, hour_of_year)
        .checked_rem(u64::from(total))
        .and_then(|r| u32::try_from(r).ok())
        .unwrap_or(0);

    let mut cumulative: u32 = 0;
    for &(weather, weight) in table {
        cumulative = cumulative.saturating_add(weight);
        if roll < cumulative {
            return weather;
        }
    }
    Weather::Clear
}

/// Segment of the day for a wall-clock hour (0-23).
pub const fn time_of_day_for_hour(hour: u32) -> TimeOfDay {
    match hour {
        5..=7 => TimeOfDay::Dawn,
        8..=17 => TimeOfDay::Day,
        18..=20 => TimeOfDay::Dusk,
        _ => TimeOfDay::Night,
    }
}

/// Segment of the day at `at`.
pub fn time_of_day(at: DateTime<Utc>) -> TimeOfDay {
    time_of_day_for_hour(at.hour())
}

/// `xorshift64` over a mixed `(seed, step)` pair.
const fn deterministic_random(seed: u64, step: u64) -> u64 {
    let mut state = seed.wrapping_add(step.wrapping_mul(0x517c_c1b7_2722_0a95));
    if state == 0 {
        state = 0xdead_beef_cafe_babe;
    }
    state ^= state << 13;
    state ^= state >> 7;
    state ^= state << 17;
    state
}
