//! Scenario tests for [`TerritoryDomain`].
//!
//! Each test wires the domain to a fallback-only cache coordinator, a
//! recording change-bus subscriber, and a manual clock.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::missing_panics_doc,
    clippy::arithmetic_side_effects,
    clippy::panic
)]

use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use turf_cache::{CacheCoordinator, CoordinatorConfig};
use turf_core::{Clock, ManualClock};
use turf_events::{Change, ChangeBus, ChangeEvent, ChangeKind};
use turf_types::{
    EconomicSignalKind, FactionId, Location, PlayerActivityKind, PlayerId, Severity, Territory,
    TerritoryId, WorldEvent, WorldEventKind,
};
use turf_world::weather::weather_at;
use turf_world::{
    EVENTS_KEY, EventFilter, TERRITORIES_KEY, TerritoryDomain, WorldError, WorldSettings,
};

struct Harness {
    cache: Arc<CacheCoordinator>,
    clock: Arc<ManualClock>,
    changes: Arc<Mutex<Vec<Change>>>,
    domain: TerritoryDomain,
}

impl Harness {
    fn kinds(&self, kind: ChangeKind) -> Vec<Change> {
        self.changes
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.event.kind() == kind)
            .cloned()
            .collect()
    }
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 15, 12, 0, 0).unwrap()
}

async fn fresh_cache() -> Arc<CacheCoordinator> {
    let cache = Arc::new(CacheCoordinator::fallback_only(CoordinatorConfig::default()));
    cache.initialize().await;
    cache
}

async fn harness_on(cache: Arc<CacheCoordinator>, at: DateTime<Utc>) -> Harness {
    let clock = Arc::new(ManualClock::new(at));
    let bus = Arc::new(ChangeBus::new());
    let changes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&changes);
    bus.subscribe_all(move |c: &Change| sink.lock().unwrap().push(c.clone()));

    let domain = TerritoryDomain::new(
        Arc::clone(&cache),
        bus,
        Arc::clone(&clock) as Arc<dyn Clock>,
        WorldSettings::default(),
    );
    domain.load_or_initialize().await;
    Harness {
        cache,
        clock,
        changes,
        domain,
    }
}

async fn harness() -> Harness {
    harness_on(fresh_cache().await, start()).await
}

/// Inside Downtown.
fn downtown_spot() -> Location {
    Location::new(0.0, 500.0, 25.0)
}

// =============================================================================
// Loading
// =============================================================================

#[tokio::test]
async fn first_boot_seeds_and_persists_five_territories() {
    let h = harness().await;
    assert_eq!(h.domain.list_territories().await.len(), 5);

    let persisted: Vec<Territory> = h.cache.get_json(TERRITORIES_KEY).await.unwrap().unwrap();
    assert_eq!(persisted, h.domain.list_territories().await);
}

#[tokio::test]
async fn corrupt_snapshot_falls_back_to_defaults() {
    let cache = fresh_cache().await;
    cache
        .set(TERRITORIES_KEY, json!({"garbage": true}), None)
        .await;
    let h = harness_on(cache, start()).await;
    assert_eq!(h.domain.list_territories().await.len(), 5);
}

#[tokio::test]
async fn restart_picks_up_persisted_state() {
    let h = harness().await;
    let downtown = TerritoryId::from("downtown");
    h.domain
        .set_territory_controller(&downtown, Some(FactionId::from("faction-3")))
        .await
        .unwrap();
    h.domain
        .record_faction_conflict(
            FactionId::from("faction-1"),
            FactionId::from("faction-2"),
            downtown_spot(),
        )
        .await
        .unwrap();

    let restarted = harness_on(Arc::clone(&h.cache), h.clock.now()).await;
    let t = restarted.domain.get_territory(&downtown).await.unwrap();
    assert_eq!(t.controlling_faction, Some(FactionId::from("faction-3")));
    let conflicts = restarted
        .domain
        .active_events(EventFilter {
            kind: Some(WorldEventKind::TerritoryConflict),
            severity: None,
        })
        .await;
    assert_eq!(conflicts.len(), 1);
}

#[tokio::test]
async fn expired_events_are_dropped_on_load() {
    let h = harness().await;
    h.domain
        .record_player_activity(
            PlayerId::from("p1"),
            PlayerActivityKind::Robbery,
            downtown_spot(),
        )
        .await
        .unwrap();

    let later = h.clock.now() + TimeDelta::minutes(21);
    let restarted = harness_on(Arc::clone(&h.cache), later).await;
    assert!(restarted.domain.active_events(EventFilter::default()).await.is_empty());
    let persisted: Vec<WorldEvent> = h.cache.get_json(EVENTS_KEY).await.unwrap().unwrap();
    assert!(persisted.is_empty());
}

// =============================================================================
// Territory control
// =============================================================================

#[tokio::test]
async fn controller_change_publishes_exactly_one_event() {
    let h = harness().await;
    let id = TerritoryId::from("docks");
    let updated = h
        .domain
        .set_territory_controller(&id, Some(FactionId::from("faction-7")))
        .await
        .unwrap();
    assert_eq!(updated.controlling_faction, Some(FactionId::from("faction-7")));

    let published = h.kinds(ChangeKind::TerritoryControlChanged);
    assert_eq!(published.len(), 1);
    let data = published[0].to_notification().unwrap().data;
    assert_eq!(data["territoryId"], "docks");
    assert!(data["previousFaction"].is_null());
    assert_eq!(data["newFaction"], "faction-7");
}

#[tokio::test]
async fn setting_same_controller_is_silent() {
    let h = harness().await;
    let id = TerritoryId::from("docks");
    h.domain.set_territory_controller(&id, None).await.unwrap();
    assert!(h.kinds(ChangeKind::TerritoryControlChanged).is_empty());
}

#[tokio::test]
async fn unknown_territory_is_not_found() {
    let h = harness().await;
    let result = h
        .domain
        .set_territory_controller(&TerritoryId::from("atlantis"), None)
        .await;
    assert_eq!(
        result,
        Err(WorldError::TerritoryNotFound(TerritoryId::from("atlantis")))
    );
    assert!(h.changes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn point_queries() {
    let h = harness().await;
    let t = h.domain.location_territory(0.0, 500.0).await.unwrap();
    assert_eq!(t.id, TerritoryId::from("downtown"));
    assert!(h.domain.location_territory(99_999.0, 0.0).await.is_none());
    assert!(!h.domain.is_contested(0.0, 500.0).await);
}

// =============================================================================
// Event synthesis
// =============================================================================

#[tokio::test]
async fn conflict_creates_thirty_minute_event_and_contests_territory() {
    let h = harness().await;
    let event = h
        .domain
        .record_faction_conflict(
            FactionId::from("faction-1"),
            FactionId::from("faction-2"),
            downtown_spot(),
        )
        .await
        .unwrap();

    assert_eq!(event.kind, WorldEventKind::TerritoryConflict);
    assert_eq!(event.severity, Severity::High);
    assert_eq!(event.expires_at - event.created_at, TimeDelta::minutes(30));
    assert!(h.domain.is_contested(0.0, 500.0).await);
    assert_eq!(h.kinds(ChangeKind::EventCreated).len(), 1);
}

#[tokio::test]
async fn repeated_conflict_escalates_to_war() {
    let h = harness().await;
    let a = FactionId::from("faction-1");
    let b = FactionId::from("faction-2");
    h.domain
        .record_faction_conflict(a.clone(), b.clone(), downtown_spot())
        .await
        .unwrap();
    let war = h
        .domain
        .record_faction_conflict(b.clone(), a.clone(), downtown_spot())
        .await
        .unwrap();
    assert_eq!(war.kind, WorldEventKind::FactionWar);
    assert_eq!(war.severity, Severity::Critical);
    assert_eq!(war.duration_minutes, 60);

    let for_a = h.domain.events_for_faction(&a).await;
    assert_eq!(for_a.len(), 2);
}

#[tokio::test]
async fn drug_deal_triggers_police_raid() {
    let h = harness().await;
    let raid = h
        .domain
        .record_player_activity(
            PlayerId::from("p1"),
            PlayerActivityKind::DrugDeal,
            downtown_spot(),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(raid.kind, WorldEventKind::PoliceRaid);
    assert_eq!(raid.duration_minutes, 20);

    let trade = h
        .domain
        .record_player_activity(PlayerId::from("p1"), PlayerActivityKind::Trade, downtown_spot())
        .await
        .unwrap();
    assert!(trade.is_none());
    assert_eq!(h.domain.snapshot().await.active_players, 1);
}

#[tokio::test]
async fn economic_signal_severity_scales_with_magnitude() {
    let h = harness().await;
    let cases = [
        (Decimal::new(25, 1), Severity::High),
        (Decimal::new(-15, 1), Severity::Medium),
        (Decimal::new(5, 1), Severity::Low),
    ];
    for (magnitude, severity) in cases {
        let event = h
            .domain
            .record_economic_signal(EconomicSignalKind::Boom, magnitude)
            .await
            .unwrap();
        assert_eq!(event.kind, WorldEventKind::EconomicShift);
        assert_eq!(event.severity, severity, "magnitude {magnitude}");
    }
    let high = h
        .domain
        .active_events(EventFilter {
            kind: None,
            severity: Some(Severity::High),
        })
        .await;
    assert_eq!(high.len(), 1);
}

#[tokio::test]
async fn invalid_location_is_rejected() {
    let h = harness().await;
    let result = h
        .domain
        .record_faction_conflict(
            FactionId::from("faction-1"),
            FactionId::from("faction-2"),
            Location::new(f64::NAN, 0.0, 1.0),
        )
        .await;
    assert!(matches!(result, Err(WorldError::Validation(_))));
    assert!(h.kinds(ChangeKind::EventCreated).is_empty());
}

// =============================================================================
// Tick
// =============================================================================

#[tokio::test]
async fn tick_expires_events_and_clears_contest() {
    let h = harness().await;
    let event = h
        .domain
        .record_faction_conflict(
            FactionId::from("faction-1"),
            FactionId::from("faction-2"),
            downtown_spot(),
        )
        .await
        .unwrap();

    h.clock.advance(TimeDelta::minutes(29));
    let report = h.domain.tick().await;
    assert!(report.expired.is_empty());
    assert!(h.domain.is_contested(0.0, 500.0).await);

    h.clock.advance(TimeDelta::minutes(1));
    let report = h.domain.tick().await;
    assert_eq!(report.expired, vec![event.id]);
    assert_eq!(report.uncontested, vec![TerritoryId::from("downtown")]);
    assert!(!h.domain.is_contested(0.0, 500.0).await);

    let expired = h.kinds(ChangeKind::EventExpired);
    assert_eq!(expired.len(), 1);
    match &expired[0].event {
        ChangeEvent::EventExpired(e) => assert_eq!(e.id, event.id),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn tick_is_idempotent_without_time_passing() {
    let h = harness().await;
    for player in ["p1", "p2"] {
        h.domain
            .record_player_activity(
                PlayerId::from(player),
                PlayerActivityKind::Robbery,
                downtown_spot(),
            )
            .await
            .unwrap();
    }
    h.clock.advance(TimeDelta::minutes(20));

    let first = h.domain.tick().await;
    assert_eq!(first.expired.len(), 2);
    let second = h.domain.tick().await;
    assert!(second.expired.is_empty());
    assert!(second.weather_event.is_none());
    assert_eq!(h.kinds(ChangeKind::EventExpired).len(), 2);
}

#[tokio::test]
async fn active_events_never_include_expired_ones() {
    let h = harness().await;
    h.domain
        .record_player_activity(
            PlayerId::from("p1"),
            PlayerActivityKind::DrugDeal,
            downtown_spot(),
        )
        .await
        .unwrap();
    h.clock.advance(TimeDelta::minutes(25));
    // No tick yet; reads still hide the expired raid.
    let now = h.clock.now();
    let events = h.domain.active_events(EventFilter::default()).await;
    assert!(events.iter().all(|e| now < e.expires_at));
    assert!(
        events
            .iter()
            .all(|e| e.kind != WorldEventKind::PoliceRaid)
    );
}

#[tokio::test]
async fn storm_or_fog_raises_one_weather_event() {
    // Find an hour with eventful weather.
    let mut at = start();
    let mut found = false;
    for _ in 0..(24 * 60) {
        if matches!(
            weather_at(at),
            turf_types::Weather::Storm | turf_types::Weather::Fog
        ) {
            found = true;
            break;
        }
        at += TimeDelta::hours(1);
    }
    assert!(found, "no storm or fog within 60 days");

    let h = harness_on(fresh_cache().await, at).await;
    let report = h.domain.tick().await;
    let event = report.weather_event.expect("weather event");
    assert_eq!(event.kind, WorldEventKind::Weather);
    assert_eq!(event.duration_minutes, 60);

    let again = h.domain.tick().await;
    assert!(again.weather_event.is_none());
    let stats = h.domain.stats().await;
    assert_eq!(stats.active_events_by_kind.get(&WorldEventKind::Weather), Some(&1));
}

#[tokio::test]
async fn stats_count_control_and_contest() {
    let h = harness().await;
    h.domain
        .set_territory_controller(&TerritoryId::from("hillside"), Some(FactionId::from("f-1")))
        .await
        .unwrap();
    h.domain
        .record_faction_conflict(
            FactionId::from("f-1"),
            FactionId::from("f-2"),
            downtown_spot(),
        )
        .await
        .unwrap();

    let stats = h.domain.stats().await;
    assert_eq!(stats.territories, 5);
    assert_eq!(stats.controlled, 1);
    assert_eq!(stats.contested, 1);
    assert_eq!(
        stats
            .active_events_by_kind
            .get(&WorldEventKind::TerritoryConflict),
        Some(&1)
    );
    assert_eq!(h.domain.snapshot().await.contested_territories, 1);
}
