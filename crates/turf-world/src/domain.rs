//! The territory/event state domain.
//!
//! [`TerritoryDomain`] owns the authoritative territory set, the active
//! world events, and player last-seen times. Every mutation follows the
//! same path: change memory, write the affected snapshot through the cache
//! coordinator, publish on the change bus. The state lock is held across
//! all three steps, so mutations never interleave and publish order always
//! matches mutation order.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use turf_cache::{CacheCoordinator, load_with_default};
use turf_core::{CacheConfig, Clock, WorldConfig};
use turf_events::{ChangeBus, ChangeEvent, TerritoryControlChange};
use turf_types::{
    EconomicClimate, EconomicSignalKind, EventId, FactionId, Location, PlayerActivityKind,
    PlayerId, Severity, Territory, TerritoryId, WorldEvent, WorldEventKind, WorldSnapshot,
    WorldStats,
};

use crate::error::{Result, WorldError};
use crate::rules::{self, EventRule};
use crate::starting_territories::{default_territories, validate_territories};
use crate::weather;

/// Cache key of the territory snapshot.
pub const TERRITORIES_KEY: &str = "world:territories";

/// Cache key of the active-event snapshot.
pub const EVENTS_KEY: &str = "world:events";

/// Radius of city-wide events (economic shifts, weather).
const CITY_RADIUS: f64 = 5_000.0;

/// Climate score above which the economy is booming.
const BOOM_SCORE: Decimal = Decimal::ONE;

/// Climate score below which the economy is in recession.
const RECESSION_SCORE: Decimal = Decimal::from_parts(2, 0, 0, true, 0);

/// Tunables for [`TerritoryDomain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldSettings {
    /// TTL applied to both snapshots.
    pub snapshot_ttl: Duration,
    /// Players seen within this window count as active.
    pub player_activity_window: Duration,
}

impl WorldSettings {
    /// Build from the process configuration.
    pub const fn from_config(cache: &CacheConfig, world: &WorldConfig) -> Self {
        Self {
            snapshot_ttl: cache.snapshot_ttl(),
            player_activity_window: Duration::from_secs(world.player_activity_window_secs),
        }
    }
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default(), &WorldConfig::default())
    }
}

/// Filter for [`TerritoryDomain::active_events`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Only events of this kind.
    pub kind: Option<WorldEventKind>,
    /// Only events of this severity.
    pub severity: Option<Severity>,
}

impl EventFilter {
    fn matches(&self, event: &WorldEvent) -> bool {
        self.kind.is_none_or(|k| k == event.kind)
            && self.severity.is_none_or(|s| s == event.severity)
    }
}

/// What one world tick changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldTickReport {
    /// Events that expired and were removed.
    pub expired: Vec<EventId>,
    /// Territories whose contested flag was cleared.
    pub uncontested: Vec<TerritoryId>,
    /// Weather event raised this tick, if any.
    pub weather_event: Option<WorldEvent>,
}

/// An economic signal that is still shaping the climate.
#[derive(Debug, Clone, Copy)]
struct ActiveSignal {
    kind: EconomicSignalKind,
    magnitude: Decimal,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct WorldState {
    territories: Vec<Territory>,
    events: Vec<WorldEvent>,
    players: HashMap<PlayerId, DateTime<Utc>>,
    signals: Vec<ActiveSignal>,
}

impl WorldState {
    fn territory_mut(&mut self, id: &TerritoryId) -> Option<&mut Territory> {
        self.territories.iter_mut().find(|t| &t.id == id)
    }

    fn territory_at(&self, x: f64, y: f64) -> Option<&Territory> {
        self.territories.iter().find(|t| t.boundary.contains(x, y))
    }

    fn active(&self, now: DateTime<Utc>) -> impl Iterator<Item = &WorldEvent> {
        self.events.iter().filter(move |e| e.is_active(now))
    }
}

/// Authoritative territory, event, and player-activity state.
pub struct TerritoryDomain {
    cache: Arc<CacheCoordinator>,
    bus: Arc<ChangeBus>,
    clock: Arc<dyn Clock>,
    settings: WorldSettings,
    state: Mutex<WorldState>,
}

impl core::fmt::Debug for TerritoryDomain {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TerritoryDomain")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl TerritoryDomain {
    /// An empty domain. Call [`TerritoryDomain::load_or_initialize`] before use.
    pub fn new(
        cache: Arc<CacheCoordinator>,
        bus: Arc<ChangeBus>,
        clock: Arc<dyn Clock>,
        settings: WorldSettings,
    ) -> Self {
        Self {
            cache,
            bus,
            clock,
            settings,
            state: Mutex::new(WorldState::default()),
        }
    }

    /// Load both snapshots, seeding defaults for anything missing or corrupt.
    ///
    /// Never fails. Events that expired while the process was down are
    /// dropped without publishing.
    pub async fn load_or_initialize(&self) {
        let now = self.clock.now();
        let ttl = Some(self.settings.snapshot_ttl);
        let mut state = self.state.lock().await;

        let territories = load_with_default(
            &self.cache,
            TERRITORIES_KEY,
            ttl,
            || default_territories(now),
            |t: &Vec<Territory>| validate_territories(t),
        )
        .await;
        let events = load_with_default(
            &self.cache,
            EVENTS_KEY,
            ttl,
            Vec::<WorldEvent>::new,
            |_| Ok(()),
        )
        .await;

        state.territories = territories.value;
        state.events = events.value;
        let before = state.events.len();
        state.events.retain(|e| e.is_active(now));
        let stale = before.saturating_sub(state.events.len());
        if stale > 0 {
            debug!(stale, "Dropped events that expired while offline");
            self.persist_events(&state).await;
        }

        info!(
            territories = state.territories.len(),
            territories_source = ?territories.source,
            events = state.events.len(),
            events_source = ?events.source,
            "Territory domain loaded"
        );
    }

    // -----------------------------------------------------------------------
    // Territories
    // -----------------------------------------------------------------------

    /// A territory by id.
    pub async fn get_territory(&self, id: &TerritoryId) -> Option<Territory> {
        let state = self.state.lock().await;
        state.territories.iter().find(|t| &t.id == id).cloned()
    }

    /// Every territory, in seed order.
    pub async fn list_territories(&self) -> Vec<Territory> {
        self.state.lock().await.territories.clone()
    }

    /// Change a territory's controlling faction.
    ///
    /// Setting the controller it already has is a no-op: nothing is
    /// persisted or published.
    pub async fn set_territory_controller(
        &self,
        id: &TerritoryId,
        faction: Option<FactionId>,
    ) -> Result<Territory> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let territory = state
            .territory_mut(id)
            .ok_or_else(|| WorldError::TerritoryNotFound(id.clone()))?;

        if territory.controlling_faction == faction {
            return Ok(territory.clone());
        }
        let previous_faction = territory.controlling_faction.clone();
        territory.controlling_faction.clone_from(&faction);
        territory.last_update = now;
        let updated = territory.clone();

        self.persist_territories(&state).await;
        info!(
            territory = %id,
            previous = ?previous_faction,
            new = ?faction,
            "Territory controller changed"
        );
        self.bus.publish(
            ChangeEvent::TerritoryControlChanged(TerritoryControlChange {
                territory_id: id.clone(),
                previous_faction,
                new_faction: faction,
            }),
            now,
        );
        Ok(updated)
    }

    /// The territory containing `(x, y)`, if any.
    pub async fn location_territory(&self, x: f64, y: f64) -> Option<Territory> {
        self.state.lock().await.territory_at(x, y).cloned()
    }

    /// Whether the territory containing `(x, y)` is contested.
    pub async fn is_contested(&self, x: f64, y: f64) -> bool {
        self.state
            .lock()
            .await
            .territory_at(x, y)
            .is_some_and(|t| t.contested)
    }

    // -----------------------------------------------------------------------
    // Event synthesis
    // -----------------------------------------------------------------------

    /// Record a clash between two factions at `location`.
    ///
    /// Creates a territory conflict, or a faction war if the pair already
    /// has an active territory conflict. The territory containing the
    /// location becomes contested.
    pub async fn record_faction_conflict(
        &self,
        faction_a: FactionId,
        faction_b: FactionId,
        location: Location,
    ) -> Result<WorldEvent> {
        if faction_a == faction_b {
            return Err(WorldError::Validation(format!(
                "faction {faction_a} cannot be in conflict with itself"
            )));
        }
        validate_location(&location)?;

        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let escalate = state.active(now).any(|e| {
            e.kind == WorldEventKind::TerritoryConflict
                && e.involves(&faction_a)
                && e.involves(&faction_b)
        });
        let rule = rules::faction_conflict(escalate);
        let description = if escalate {
            format!("War has broken out between {faction_a} and {faction_b}")
        } else {
            format!("Territory conflict between {faction_a} and {faction_b}")
        };
        let event = build_event(rule, location, vec![faction_a, faction_b], description, now);

        let contested = match state
            .territories
            .iter_mut()
            .find(|t| t.boundary.contains(location.x, location.y))
        {
            Some(t) if !t.contested => {
                t.contested = true;
                t.last_update = now;
                true
            }
            _ => false,
        };

        state.events.push(event.clone());
        self.persist_events(&state).await;
        if contested {
            self.persist_territories(&state).await;
        }
        info!(event = %event.id, kind = ?event.kind, escalate, "Faction conflict recorded");
        self.bus.publish(ChangeEvent::EventCreated(event.clone()), now);
        Ok(event)
    }

    /// Record what a player did at `location`.
    ///
    /// Always refreshes the player's last-seen time. Returns the event the
    /// activity raised, if any.
    pub async fn record_player_activity(
        &self,
        player: PlayerId,
        kind: PlayerActivityKind,
        location: Location,
    ) -> Result<Option<WorldEvent>> {
        if player.as_str().trim().is_empty() {
            return Err(WorldError::Validation(String::from("player id is empty")));
        }
        validate_location(&location)?;

        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let event = rules::player_activity(kind).map(|rule| {
            let factions: Vec<FactionId> = state
                .territory_at(location.x, location.y)
                .and_then(|t| t.controlling_faction.clone())
                .into_iter()
                .collect();
            let label = rules::activity_label(kind);
            let description = match rule.kind {
                WorldEventKind::PoliceRaid => format!("Police respond to a {label} by {player}"),
                _ => format!("A {label} involving {player} sparks conflict"),
            };
            build_event(rule, location, factions, description, now)
        });
        state.players.insert(player, now);

        let Some(event) = event else {
            debug!(?kind, "Player activity recorded");
            return Ok(None);
        };
        state.events.push(event.clone());
        self.persist_events(&state).await;
        info!(event = %event.id, kind = ?event.kind, "Player activity raised an event");
        self.bus.publish(ChangeEvent::EventCreated(event.clone()), now);
        Ok(Some(event))
    }

    /// Record a city-wide economic signal.
    pub async fn record_economic_signal(
        &self,
        kind: EconomicSignalKind,
        magnitude: Decimal,
    ) -> Result<WorldEvent> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let rule = rules::economic_signal(magnitude);
        let description = format!(
            "Economic {} of magnitude {magnitude}",
            rules::signal_label(kind)
        );
        let event = build_event(
            rule,
            Location::new(0.0, 0.0, CITY_RADIUS),
            Vec::new(),
            description,
            now,
        );

        state.signals.push(ActiveSignal {
            kind,
            magnitude,
            expires_at: event.expires_at,
        });
        state.events.push(event.clone());
        self.persist_events(&state).await;
        info!(event = %event.id, severity = ?event.severity, "Economic signal recorded");
        self.bus.publish(ChangeEvent::EventCreated(event.clone()), now);
        Ok(event)
    }

    // -----------------------------------------------------------------------
    // Periodic recomputation
    // -----------------------------------------------------------------------

    /// Expire events, settle contested territories, and raise weather.
    ///
    /// Running it twice without the clock moving changes nothing the
    /// second time.
    pub async fn tick(&self) -> WorldTickReport {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let mut report = WorldTickReport::default();

        let (live, expired): (Vec<WorldEvent>, Vec<WorldEvent>) = core::mem::take(&mut state.events)
            .into_iter()
            .partition(|e| e.is_active(now));
        state.events = live;
        state.signals.retain(|s| now < s.expires_at);
        let window = self.activity_window();
        state
            .players
            .retain(|_, seen| now.signed_duration_since(*seen) <= window);

        let mut uncontested = Vec::new();
        let conflicts: Vec<&WorldEvent> = state
            .events
            .iter()
            .filter(|e| {
                matches!(
                    e.kind,
                    WorldEventKind::TerritoryConflict | WorldEventKind::FactionWar
                )
            })
            .collect();
        let settled: Vec<TerritoryId> = state
            .territories
            .iter()
            .filter(|t| {
                t.contested
                    && !conflicts.iter().any(|e| {
                        t.boundary
                            .intersects_circle(e.location.x, e.location.y, e.location.radius)
                    })
            })
            .map(|t| t.id.clone())
            .collect();
        for id in settled {
            if let Some(t) = state.territory_mut(&id) {
                t.contested = false;
                t.last_update = now;
                uncontested.push(id);
            }
        }

        let current = weather::weather_at(now);
        let weather_active = state.events.iter().any(|e| e.kind == WorldEventKind::Weather);
        if let Some(rule) = rules::weather(current).filter(|_| !weather_active) {
            let event = build_event(
                rule,
                Location::new(0.0, 0.0, CITY_RADIUS),
                Vec::new(),
                format!("{current:?} rolls over the city"),
                now,
            );
            state.events.push(event.clone());
            report.weather_event = Some(event);
        }

        if !expired.is_empty() || report.weather_event.is_some() {
            self.persist_events(&state).await;
        }
        if !uncontested.is_empty() {
            self.persist_territories(&state).await;
        }

        for event in expired {
            debug!(event = %event.id, kind = ?event.kind, "Event expired");
            report.expired.push(event.id);
            self.bus.publish(ChangeEvent::EventExpired(event), now);
        }
        if let Some(event) = &report.weather_event {
            self.bus.publish(ChangeEvent::EventCreated(event.clone()), now);
        }
        report.uncontested = uncontested;

        debug!(
            expired = report.expired.len(),
            uncontested = report.uncontested.len(),
            weather = report.weather_event.is_some(),
            "World tick complete"
        );
        report
    }

    // -----------------------------------------------------------------------
    // Read models
    // -----------------------------------------------------------------------

    /// Active events matching `filter`, oldest first.
    pub async fn active_events(&self, filter: EventFilter) -> Vec<WorldEvent> {
        let now = self.clock.now();
        let state = self.state.lock().await;
        state
            .active(now)
            .filter(|e| filter.matches(e))
            .cloned()
            .collect()
    }

    /// Active events that list `faction` as affected.
    pub async fn events_for_faction(&self, faction: &FactionId) -> Vec<WorldEvent> {
        let now = self.clock.now();
        let state = self.state.lock().await;
        state
            .active(now)
            .filter(|e| e.involves(faction))
            .cloned()
            .collect()
    }

    fn activity_window(&self) -> TimeDelta {
        TimeDelta::from_std(self.settings.player_activity_window).unwrap_or(TimeDelta::MAX)
    }

    /// Materialized world view.
    pub async fn snapshot(&self) -> WorldSnapshot {
        let now = self.clock.now();
        let state = self.state.lock().await;
        let window = self.activity_window();

        let active_players = state
            .players
            .values()
            .filter(|seen| now.signed_duration_since(**seen) <= window)
            .count();
        let score = state
            .signals
            .iter()
            .filter(|s| now < s.expires_at)
            .fold(Decimal::ZERO, |acc, s| {
                acc.saturating_add(rules::climate_score(s.kind, s.magnitude))
            });

        WorldSnapshot {
            active_players: count(active_players),
            weather: weather::weather_at(now),
            time_of_day: weather::time_of_day(now),
            economic_climate: climate(score),
            active_events: count(state.active(now).count()),
            contested_territories: count(state.territories.iter().filter(|t| t.contested).count()),
            generated_at: now,
        }
    }

    /// Aggregate territory and event counts.
    pub async fn stats(&self) -> WorldStats {
        let now = self.clock.now();
        let state = self.state.lock().await;
        let mut by_kind: BTreeMap<WorldEventKind, u32> = BTreeMap::new();
        for event in state.active(now) {
            let n = by_kind.entry(event.kind).or_insert(0);
            *n = n.saturating_add(1);
        }
        WorldStats {
            territories: count(state.territories.len()),
            controlled: count(
                state
                    .territories
                    .iter()
                    .filter(|t| t.controlling_faction.is_some())
                    .count(),
            ),
            contested: count(state.territories.iter().filter(|t| t.contested).count()),
            active_events_by_kind: by_kind,
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    async fn persist_territories(&self, state: &WorldState) {
        let ttl = Some(self.settings.snapshot_ttl);
        if !self.cache.set_json(TERRITORIES_KEY, &state.territories, ttl).await {
            warn!(key = TERRITORIES_KEY, "Failed to write territory snapshot");
        }
    }

    async fn persist_events(&self, state: &WorldState) {
        let ttl = Some(self.settings.snapshot_ttl);
        if !self.cache.set_json(EVENTS_KEY, &state.events, ttl).await {
            warn!(key = EVENTS_KEY, "Failed to write event snapshot");
        }
    }
}

fn build_event(
    rule: EventRule,
    location: Location,
    factions: Vec<FactionId>,
    description: String,
    now: DateTime<Utc>,
) -> WorldEvent {
    WorldEvent::new(
        rule.kind,
        location,
        rule.severity,
        rule.duration_minutes,
        factions,
        description,
        now,
    )
}

fn validate_location(location: &Location) -> Result<()> {
    if location.is_valid() {
        Ok(())
    } else {
        Err(WorldError::Validation(format!(
            "invalid location ({}, {}) radius {}",
            location.x, location.y, location.radius
        )))
    }
}

fn climate(score: Decimal) -> EconomicClimate {
    if score > BOOM_SCORE {
        EconomicClimate::Booming
    } else if score < RECESSION_SCORE {
        EconomicClimate::Recession
    } else if score < Decimal::ZERO {
        EconomicClimate::Strained
    } else {
        EconomicClimate::Stable
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
