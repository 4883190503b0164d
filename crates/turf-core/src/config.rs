//! Configuration loading and typed config structures for the Turf simulation.
//!
//! The canonical configuration lives in `turf-config.yaml` at the project
//! root. Every field has a default, so an absent section (or an absent
//! file, see [`TurfConfig::load_or_default`]) yields a runnable process.

use std::path::Path;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override held an unusable value.
    #[error("invalid value {value:?} for {var}: {reason}")]
    Env {
        /// Variable name.
        var: &'static str,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level process configuration. Mirrors `turf-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TurfConfig {
    /// Cache coordinator and durable store settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Territory/event domain settings.
    #[serde(default)]
    pub world: WorldConfig,

    /// Market/indicator domain settings.
    #[serde(default)]
    pub market: MarketConfig,

    /// Real-time observer settings.
    #[serde(default)]
    pub observer: ObserverConfig,
}

impl TurfConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `DRAGONFLY_URL` overrides `cache.url`
    /// - `OBSERVER_PORT` overrides `observer.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Env`] if an override cannot be parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Like [`TurfConfig::from_file`], but a missing file yields defaults
    /// (with environment overrides still applied).
    ///
    /// # Errors
    ///
    /// Returns any error other than "file not found".
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Config file not found, using defaults");
                let mut config = Self::default();
                config.apply_env_overrides()?;
                Ok(config)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Env`] if an override cannot be parsed.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply `DRAGONFLY_URL` and `OBSERVER_PORT` from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if `OBSERVER_PORT` is not a port number.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("DRAGONFLY_URL") {
            self.cache.url = val;
        }
        if let Ok(val) = std::env::var("OBSERVER_PORT") {
            self.observer.port = val.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::Env {
                    var: "OBSERVER_PORT",
                    value: val.clone(),
                    reason: e.to_string(),
                }
            })?;
        }
        Ok(())
    }
}

/// Cache coordinator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CacheConfig {
    /// Durable store connection URL.
    #[serde(default = "default_cache_url")]
    pub url: String,

    /// Upper bound on any single durable-store call, in milliseconds.
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,

    /// Upper bound on connect plus first probe, in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Time-to-live for domain snapshots, in seconds.
    #[serde(default = "default_snapshot_ttl_secs")]
    pub snapshot_ttl_secs: u64,
}

impl CacheConfig {
    /// Per-operation timeout.
    pub const fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }

    /// Connect timeout.
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Snapshot TTL.
    pub const fn snapshot_ttl(&self) -> Duration {
        Duration::from_secs(self.snapshot_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: default_cache_url(),
            op_timeout_ms: default_op_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            snapshot_ttl_secs: default_snapshot_ttl_secs(),
        }
    }
}

/// Territory/event domain configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Seconds between world ticks.
    #[serde(default = "default_world_tick_secs")]
    pub tick_interval_secs: u64,

    /// A player counts as active if seen within this many seconds.
    #[serde(default = "default_player_window_secs")]
    pub player_activity_window_secs: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_world_tick_secs(),
            player_activity_window_secs: default_player_window_secs(),
        }
    }
}

/// Market/indicator domain configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MarketConfig {
    /// Seconds between market ticks.
    #[serde(default = "default_market_tick_secs")]
    pub tick_interval_secs: u64,

    /// Pricing model parameters.
    #[serde(default)]
    pub pricing: PricingConfig,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_market_tick_secs(),
            pricing: PricingConfig::default(),
        }
    }
}

/// Tunable constants of the market pricing model.
///
/// Defaults are the historical literal constants of the pricing model.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PricingConfig {
    /// Weight of the `demand / supply - 1` pressure term.
    #[serde(default = "default_supply_demand_weight")]
    pub supply_demand_weight: Decimal,

    /// Weight of the `recent / average volume - 1` activity term.
    #[serde(default = "default_activity_weight")]
    pub activity_weight: Decimal,

    /// Weight of inflation (percent / 100) in the price multiplier.
    #[serde(default = "default_inflation_weight")]
    pub inflation_weight: Decimal,

    /// Boost applied to a category while an event affecting it is active.
    #[serde(default = "default_event_boost")]
    pub event_boost: Decimal,

    /// Minimum relative move (0.01 = 1%) before a new price is published.
    #[serde(default = "default_update_threshold")]
    pub update_threshold: Decimal,

    /// Fraction of the current price paid to sellers.
    #[serde(default = "default_sell_ratio")]
    pub sell_ratio: Decimal,

    /// Supply below which an item is restocked on tick.
    #[serde(default = "default_restock_below")]
    pub restock_below: u32,

    /// Units added by an automatic restock.
    #[serde(default = "default_restock_amount")]
    pub restock_amount: u32,

    /// Lowest level demand decays to.
    #[serde(default = "default_demand_floor")]
    pub demand_floor: u32,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            supply_demand_weight: default_supply_demand_weight(),
            activity_weight: default_activity_weight(),
            inflation_weight: default_inflation_weight(),
            event_boost: default_event_boost(),
            update_threshold: default_update_threshold(),
            sell_ratio: default_sell_ratio(),
            restock_below: default_restock_below(),
            restock_amount: default_restock_amount(),
            demand_floor: default_demand_floor(),
        }
    }
}

/// Real-time observer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObserverConfig {
    /// Bind address.
    #[serde(default = "default_observer_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_observer_port")]
    pub port: u16,

    /// Capacity of the bus-to-observer notification queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Capacity of the per-client broadcast channel.
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            host: default_observer_host(),
            port: default_observer_port(),
            queue_capacity: default_queue_capacity(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_cache_url() -> String {
    "redis://localhost:6379".to_owned()
}

const fn default_op_timeout_ms() -> u64 {
    500
}

const fn default_connect_timeout_ms() -> u64 {
    3_000
}

const fn default_snapshot_ttl_secs() -> u64 {
    600
}

const fn default_world_tick_secs() -> u64 {
    60
}

const fn default_player_window_secs() -> u64 {
    900
}

const fn default_market_tick_secs() -> u64 {
    300
}

const fn default_supply_demand_weight() -> Decimal {
    Decimal::from_parts(1, 0, 0, false, 1)
}

const fn default_activity_weight() -> Decimal {
    Decimal::from_parts(5, 0, 0, false, 2)
}

const fn default_inflation_weight() -> Decimal {
    Decimal::from_parts(3, 0, 0, false, 2)
}

const fn default_event_boost() -> Decimal {
    Decimal::from_parts(8, 0, 0, false, 2)
}

const fn default_update_threshold() -> Decimal {
    Decimal::from_parts(1, 0, 0, false, 2)
}

const fn default_sell_ratio() -> Decimal {
    Decimal::from_parts(9, 0, 0, false, 1)
}

const fn default_restock_below() -> u32 {
    20
}

const fn default_restock_amount() -> u32 {
    10
}

const fn default_demand_floor() -> u32 {
    10
}

fn default_observer_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_observer_port() -> u16 {
    8080
}

const fn default_queue_capacity() -> usize {
    1_024
}

const fn default_broadcast_capacity() -> usize {
    256
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = TurfConfig::default();
        assert_eq!(config.cache.snapshot_ttl_secs, 600);
        assert_eq!(config.market.pricing.supply_demand_weight, Decimal::new(1, 1));
        assert_eq!(config.market.pricing.activity_weight, Decimal::new(5, 2));
        assert_eq!(config.market.pricing.inflation_weight, Decimal::new(3, 2));
        assert_eq!(config.market.pricing.event_boost, Decimal::new(8, 2));
        assert_eq!(config.market.pricing.update_threshold, Decimal::new(1, 2));
        assert_eq!(config.market.pricing.sell_ratio, Decimal::new(9, 1));
        assert_eq!(config.cache.op_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn parse_partial_yaml_fills_defaults() {
        let yaml = r#"
cache:
  op_timeout_ms: 250
world:
  tick_interval_secs: 15
market:
  pricing:
    event_boost: 0.2
    restock_below: 5
observer:
  host: "127.0.0.1"
"#;
        let config: TurfConfig = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config.cache.op_timeout_ms, 250);
        assert_eq!(config.cache.connect_timeout_ms, 3_000);
        assert_eq!(config.world.tick_interval_secs, 15);
        assert_eq!(config.world.player_activity_window_secs, 900);
        assert_eq!(config.market.tick_interval_secs, 300);
        assert_eq!(config.market.pricing.event_boost, Decimal::new(2, 1));
        assert_eq!(config.market.pricing.restock_below, 5);
        assert_eq!(config.market.pricing.restock_amount, 10);
        assert_eq!(config.observer.host, "127.0.0.1");
        assert_eq!(config.observer.port, 8080);
    }

    #[test]
    fn empty_document_is_all_defaults() {
        let config: TurfConfig = serde_yml::from_str("{}").unwrap();
        assert_eq!(config, TurfConfig::default());
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let result = TurfConfig::parse("cache: [unterminated");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config =
            TurfConfig::load_or_default(Path::new("/nonexistent/turf-config.yaml")).unwrap();
        assert_eq!(config.market.pricing, PricingConfig::default());
    }
}
