//! Engine binary for the Turf live-state simulation.
//!
//! Wires the cache coordinator, the change bus, both state domains, their
//! periodic ticks, and the observer server, then runs until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `turf-config.yaml` (defaults if absent)
//! 3. Build the cache coordinator over `Dragonfly`
//! 4. Initialize the coordinator (falls back to memory if unreachable)
//! 5. Create the change bus, forwarder queue, fan-out task, observer server
//! 6. Load or seed both state domains
//! 7. Spawn the world and market tick loops
//!
//! # Shutdown Sequence
//!
//! 1. `Ctrl-C` triggers the shared shutdown flag
//! 2. Tick loops finish their current tick and stop; the server drains
//! 3. The forwarder is detached and the fan-out task drains its queue
//! 4. The coordinator disconnects; teardown errors fail the process

mod error;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use turf_cache::{CacheCoordinator, CoordinatorConfig, DragonflyStore};
use turf_core::{CacheConfig, Clock, LoopResult, Shutdown, SystemClock, TurfConfig, run_periodic};
use turf_events::{ChangeBus, attach_forwarder};
use turf_market::{InMemoryLedger, MarketDomain, MarketSettings};
use turf_observer::{AppState, ServerConfig, spawn_fanout, start_server};
use turf_world::{EventFilter, TerritoryDomain, WorldSettings};

use crate::error::EngineError;

/// Configuration file looked up in the working directory.
const CONFIG_PATH: &str = "turf-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the shutdown signal
/// cannot be installed, a background task fails, or the durable store
/// connection fails to tear down.
#[tokio::main]
#[allow(clippy::too_many_lines)]
async fn main() -> Result<(), EngineError> {
    // 1. Initialize structured logging.
    init_tracing();
    info!("turf-engine starting");

    // 2. Load configuration.
    let config = TurfConfig::load_or_default(Path::new(CONFIG_PATH))?;
    info!(
        cache_url = %config.cache.url,
        world_tick_secs = config.world.tick_interval_secs,
        market_tick_secs = config.market.tick_interval_secs,
        observer_port = config.observer.port,
        "Configuration loaded"
    );

    // 3-4. Cache coordinator.
    let cache = Arc::new(build_cache(&config.cache));
    cache.initialize().await;
    info!(backend = ?cache.backend(), "Cache coordinator initialized");

    // 5. Change bus and observer.
    let shutdown = Shutdown::new();
    let bus = Arc::new(ChangeBus::new());
    let (forwarder, queue) = attach_forwarder(&bus, config.observer.queue_capacity);
    let app_state = Arc::new(AppState::new(
        Arc::clone(&cache),
        config.observer.broadcast_capacity,
    ));
    let fanout = spawn_fanout(queue, Arc::clone(&app_state));
    let server_config = ServerConfig {
        host: config.observer.host.clone(),
        port: config.observer.port,
    };
    let server_shutdown = shutdown.subscribe();
    let server = tokio::spawn(async move {
        start_server(&server_config, app_state, server_shutdown).await
    });

    // 6. State domains.
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let world = Arc::new(TerritoryDomain::new(
        Arc::clone(&cache),
        Arc::clone(&bus),
        Arc::clone(&clock),
        WorldSettings::from_config(&config.cache, &config.world),
    ));
    let market = Arc::new(MarketDomain::new(
        Arc::clone(&cache),
        Arc::clone(&bus),
        clock,
        Arc::new(InMemoryLedger::new()),
        MarketSettings::from_config(&config.cache, &config.market),
    ));
    world.load_or_initialize().await;
    market.load_or_initialize().await;

    // 7. Periodic ticks.
    let world_loop = spawn_world_loop(
        Arc::clone(&world),
        Duration::from_secs(config.world.tick_interval_secs),
        &shutdown,
    );
    let market_loop = spawn_market_loop(
        world,
        market,
        Duration::from_secs(config.market.tick_interval_secs),
        &shutdown,
    );
    info!("Simulation running, press Ctrl-C to stop");

    // Shutdown.
    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    shutdown.trigger();

    for (name, handle) in [("world", world_loop), ("market", market_loop)] {
        let result = join(name, handle).await?;
        info!(
            name = result.name,
            total_ticks = result.total_ticks,
            end_reason = ?result.end_reason,
            "Tick loop finished"
        );
    }

    if let Err(e) = join("observer", server).await? {
        warn!(error = %e, "Observer server exited with an error");
    }

    bus.unsubscribe(forwarder);
    let forwarded = join("fanout", fanout).await?;
    debug!(forwarded, "Fan-out drained");

    cache.disconnect().await?;
    info!("turf-engine shutdown complete");
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` sets the filter (default
/// `info`); `TURF_LOG_JSON` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var_os("TURF_LOG_JSON").is_some() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// Coordinator over `Dragonfly`, or fallback-only if the URL is unusable.
fn build_cache(config: &CacheConfig) -> CacheCoordinator {
    let coordinator_config = CoordinatorConfig {
        op_timeout: config.op_timeout(),
        connect_timeout: config.connect_timeout(),
    };
    match DragonflyStore::from_url(&config.url) {
        Ok(store) => CacheCoordinator::new(Arc::new(store), coordinator_config),
        Err(e) => {
            warn!(url = %config.url, error = %e, "Invalid cache URL, running on fallback store only");
            CacheCoordinator::fallback_only(coordinator_config)
        }
    }
}

fn spawn_world_loop(
    world: Arc<TerritoryDomain>,
    interval: Duration,
    shutdown: &Shutdown,
) -> JoinHandle<LoopResult> {
    tokio::spawn(run_periodic("world", interval, shutdown.subscribe(), move || {
        let world = Arc::clone(&world);
        async move {
            let report = world.tick().await;
            if !report.expired.is_empty() || report.weather_event.is_some() {
                info!(
                    expired = report.expired.len(),
                    uncontested = report.uncontested.len(),
                    weather = report.weather_event.is_some(),
                    "World tick"
                );
            }
        }
    }))
}

fn spawn_market_loop(
    world: Arc<TerritoryDomain>,
    market: Arc<MarketDomain>,
    interval: Duration,
    shutdown: &Shutdown,
) -> JoinHandle<LoopResult> {
    tokio::spawn(run_periodic("market", interval, shutdown.subscribe(), move || {
        let world = Arc::clone(&world);
        let market = Arc::clone(&market);
        async move {
            let events = world.active_events(EventFilter::default()).await;
            let report = market.tick(&events).await;
            if !report.price_changes.is_empty() {
                info!(
                    repriced = report.price_changes.len(),
                    restocked = report.restocked.len(),
                    "Market tick"
                );
            }
        }
    }))
}

async fn join<T>(name: &'static str, handle: JoinHandle<T>) -> Result<T, EngineError> {
    handle.await.map_err(|e| EngineError::Task {
        name,
        message: e.to_string(),
    })
}
