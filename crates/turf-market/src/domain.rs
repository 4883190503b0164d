//! The market/indicator state domain.
//!
//! [`MarketDomain`] owns the item catalog, the economic indicator set, the
//! recent transaction log, and per-item trading activity. Mutations follow
//! the same path as the territory domain: change memory, write the snapshot
//! through the cache coordinator, publish on the change bus, all under one
//! lock so publish order matches mutation order.
//!
//! Purchases and sales touch the external ledger. The ledger call is the
//! last fallible step before any in-memory change, so a failed request
//! leaves items, the transaction log, and the balance untouched.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use turf_cache::{CacheCoordinator, load_with_default};
use turf_core::{CacheConfig, Clock, MarketConfig, PricingConfig};
use turf_events::{ChangeBus, ChangeEvent};
use turf_types::{
    ActorId, EconomicIndicators, IndicatorsPatch, ItemCategory, ItemId, MarketItem, MarketStats,
    PriceChange, Transaction, TransactionId, TransactionKind, WorldEvent,
};

use crate::catalog::{default_indicators, default_items, validate_indicators, validate_items};
use crate::error::{MarketError, Result};
use crate::ledger::BalanceLedger;
use crate::pricing;

/// Cache key of the item catalog snapshot.
pub const ITEMS_KEY: &str = "market:items";

/// Cache key of the indicator snapshot.
pub const INDICATORS_KEY: &str = "market:indicators";

/// Transactions kept in memory; older entries fall off the front.
pub const TRANSACTION_LOG_CAP: usize = 10_000;

/// Window over which recent trading volume is measured.
const VOLUME_WINDOW: TimeDelta = TimeDelta::hours(1);

/// Window covered by [`MarketDomain::stats`].
const STATS_WINDOW: TimeDelta = TimeDelta::hours(24);

/// Tunables for [`MarketDomain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketSettings {
    /// TTL applied to both snapshots.
    pub snapshot_ttl: Duration,
    /// Pricing model weights and thresholds.
    pub pricing: PricingConfig,
}

impl MarketSettings {
    /// Build from the process configuration.
    pub fn from_config(cache: &CacheConfig, market: &MarketConfig) -> Self {
        Self {
            snapshot_ttl: cache.snapshot_ttl(),
            pricing: market.pricing.clone(),
        }
    }
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default(), &MarketConfig::default())
    }
}

/// Outcome of a purchase or sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeReceipt {
    /// The appended transaction.
    pub transaction: Transaction,
    /// The item after the trade.
    pub item: MarketItem,
    /// The actor's balance after the trade.
    pub balance: Decimal,
}

/// What one market tick changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketTickReport {
    /// Prices that moved past the update threshold.
    pub price_changes: Vec<PriceChange>,
    /// Items automatically restocked.
    pub restocked: Vec<ItemId>,
    /// Items whose demand decayed.
    pub demand_decayed: Vec<ItemId>,
}

/// Trading activity of one item.
#[derive(Debug, Clone)]
struct ItemActivity {
    /// `(when, units)` for trades inside the volume window.
    trades: VecDeque<(DateTime<Utc>, u32)>,
    /// Reference point for demand decay; reset by purchases.
    decay_from: DateTime<Utc>,
}

impl ItemActivity {
    const fn new(now: DateTime<Utc>) -> Self {
        Self {
            trades: VecDeque::new(),
            decay_from: now,
        }
    }

    fn record(&mut self, now: DateTime<Utc>, units: u32) {
        self.trades.push_back((now, units));
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = now.checked_sub_signed(VOLUME_WINDOW).unwrap_or(DateTime::<Utc>::MIN_UTC);
        while self.trades.front().is_some_and(|(at, _)| *at <= cutoff) {
            self.trades.pop_front();
        }
    }

    fn volume(&self) -> Decimal {
        let units = self
            .trades
            .iter()
            .fold(0_u64, |acc, (_, units)| acc.saturating_add(u64::from(*units)));
        Decimal::from(units)
    }
}

#[derive(Debug)]
struct MarketState {
    items: Vec<MarketItem>,
    indicators: EconomicIndicators,
    transactions: VecDeque<Transaction>,
    activity: HashMap<ItemId, ItemActivity>,
}

impl MarketState {
    fn item_index(&self, id: &ItemId) -> Result<usize> {
        self.items
            .iter()
            .position(|i| &i.id == id)
            .ok_or_else(|| MarketError::ItemNotFound(id.clone()))
    }

    fn activity_mut(&mut self, id: &ItemId, now: DateTime<Utc>) -> &mut ItemActivity {
        self.activity
            .entry(id.clone())
            .or_insert_with(|| ItemActivity::new(now))
    }

    fn append(&mut self, transaction: Transaction) {
        if self.transactions.len() >= TRANSACTION_LOG_CAP {
            self.transactions.pop_front();
        }
        self.transactions.push_back(transaction);
    }
}

/// Authoritative market, indicator, and transaction state.
pub struct MarketDomain {
    cache: Arc<CacheCoordinator>,
    bus: Arc<ChangeBus>,
    clock: Arc<dyn Clock>,
    ledger: Arc<dyn BalanceLedger>,
    settings: MarketSettings,
    state: Mutex<MarketState>,
}

impl core::fmt::Debug for MarketDomain {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MarketDomain")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl MarketDomain {
    /// An empty catalog with default indicators. Call
    /// [`MarketDomain::load_or_initialize`] before use.
    pub fn new(
        cache: Arc<CacheCoordinator>,
        bus: Arc<ChangeBus>,
        clock: Arc<dyn Clock>,
        ledger: Arc<dyn BalanceLedger>,
        settings: MarketSettings,
    ) -> Self {
        let now = clock.now();
        Self {
            cache,
            bus,
            clock,
            ledger,
            settings,
            state: Mutex::new(MarketState {
                items: Vec::new(),
                indicators: default_indicators(now),
                transactions: VecDeque::new(),
                activity: HashMap::new(),
            }),
        }
    }

    /// Load the catalog and indicators, seeding defaults for anything
    /// missing or corrupt. Never fails.
    pub async fn load_or_initialize(&self) {
        let now = self.clock.now();
        let ttl = Some(self.settings.snapshot_ttl);
        let mut state = self.state.lock().await;

        let items = load_with_default(
            &self.cache,
            ITEMS_KEY,
            ttl,
            || default_items(now),
            |i: &Vec<MarketItem>| validate_items(i),
        )
        .await;
        let indicators = load_with_default(
            &self.cache,
            INDICATORS_KEY,
            ttl,
            || default_indicators(now),
            validate_indicators,
        )
        .await;

        state.activity = items
            .value
            .iter()
            .map(|i| (i.id.clone(), ItemActivity::new(now)))
            .collect();
        state.items = items.value;
        state.indicators = indicators.value;

        info!(
            items = state.items.len(),
            items_source = ?items.source,
            indicators_source = ?indicators.source,
            "Market domain loaded"
        );
    }

    // -----------------------------------------------------------------------
    // Trading
    // -----------------------------------------------------------------------

    /// Buy `quantity` units of `item` at the current price.
    ///
    /// Supply drops by twice the quantity and demand rises by the quantity.
    pub async fn purchase(
        &self,
        actor: &ActorId,
        item: &ItemId,
        quantity: u32,
    ) -> Result<TradeReceipt> {
        validate_trade(actor, quantity)?;
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let idx = state.item_index(item)?;
        let unit_price = state
            .items
            .get(idx)
            .map(|i| i.current_price)
            .ok_or_else(|| MarketError::ItemNotFound(item.clone()))?;
        let total = total_cost(unit_price, quantity)?;

        let available = self
            .ledger
            .balance(actor)
            .await
            .map_err(MarketError::from_ledger)?;
        if available < total {
            debug!(%actor, %item, %total, %available, "Purchase rejected");
            return Err(MarketError::InsufficientFunds {
                actor: actor.clone(),
                required: total,
                available,
            });
        }
        let balance = self
            .ledger
            .debit(actor, total)
            .await
            .map_err(MarketError::from_ledger)?;

        let updated = {
            let entry = state
                .items
                .get_mut(idx)
                .ok_or_else(|| MarketError::ItemNotFound(item.clone()))?;
            entry.supply = entry.supply.saturating_sub(quantity.saturating_mul(2));
            entry.demand = pricing::clamp_level(entry.demand.saturating_add(quantity));
            entry.last_update = now;
            entry.clone()
        };
        let activity = state.activity_mut(item, now);
        activity.record(now, quantity);
        activity.decay_from = now;

        let transaction = trade_transaction(
            TransactionKind::Purchase,
            actor,
            &updated,
            quantity,
            unit_price,
            total,
            now,
        );
        state.append(transaction.clone());

        self.persist_items(&state).await;
        info!(%actor, %item, quantity, %total, "Purchase completed");
        self.bus
            .publish(ChangeEvent::TransactionCompleted(transaction.clone()), now);
        Ok(TradeReceipt {
            transaction,
            item: updated,
            balance,
        })
    }

    /// Sell `quantity` units of `item` at the current price less the spread.
    ///
    /// Supply rises and demand falls by the quantity.
    pub async fn sell(&self, actor: &ActorId, item: &ItemId, quantity: u32) -> Result<TradeReceipt> {
        validate_trade(actor, quantity)?;
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let idx = state.item_index(item)?;
        let current = state
            .items
            .get(idx)
            .map(|i| i.current_price)
            .ok_or_else(|| MarketError::ItemNotFound(item.clone()))?;
        let unit_price = current
            .checked_mul(self.settings.pricing.sell_ratio)
            .ok_or_else(|| MarketError::Validation(format!("sale price of {item} overflows")))?;
        let total = total_cost(unit_price, quantity)?;

        let balance = self
            .ledger
            .credit(actor, total)
            .await
            .map_err(MarketError::from_ledger)?;

        let updated = {
            let entry = state
                .items
                .get_mut(idx)
                .ok_or_else(|| MarketError::ItemNotFound(item.clone()))?;
            entry.supply = pricing::clamp_level(entry.supply.saturating_add(quantity));
            entry.demand = entry.demand.saturating_sub(quantity);
            entry.last_update = now;
            entry.clone()
        };
        state.activity_mut(item, now).record(now, quantity);

        let transaction = trade_transaction(
            TransactionKind::Sale,
            actor,
            &updated,
            quantity,
            unit_price,
            total,
            now,
        );
        state.append(transaction.clone());

        self.persist_items(&state).await;
        info!(%actor, %item, quantity, %total, "Sale completed");
        self.bus
            .publish(ChangeEvent::TransactionCompleted(transaction.clone()), now);
        Ok(TradeReceipt {
            transaction,
            item: updated,
            balance,
        })
    }

    /// Add `quantity` units of supply to `item`, capped at the level maximum.
    pub async fn restock(&self, item: &ItemId, quantity: u32) -> Result<MarketItem> {
        if quantity == 0 {
            return Err(MarketError::Validation(String::from(
                "restock quantity must be positive",
            )));
        }
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let idx = state.item_index(item)?;
        let updated = {
            let entry = state
                .items
                .get_mut(idx)
                .ok_or_else(|| MarketError::ItemNotFound(item.clone()))?;
            entry.supply = pricing::clamp_level(entry.supply.saturating_add(quantity));
            entry.last_update = now;
            entry.clone()
        };
        self.persist_items(&state).await;
        debug!(%item, quantity, supply = updated.supply, "Item restocked");
        Ok(updated)
    }

    // -----------------------------------------------------------------------
    // Periodic recomputation
    // -----------------------------------------------------------------------

    /// Decay idle demand, restock thin items, and reprice the catalog.
    ///
    /// `events` are the world's currently active events; those still
    /// active at the market clock boost the categories they affect.
    pub async fn tick(&self, events: &[WorldEvent]) -> MarketTickReport {
        let now = self.clock.now();
        let cfg = &self.settings.pricing;
        let mut state = self.state.lock().await;
        let mut report = MarketTickReport::default();

        let boosted: Vec<ItemCategory> = events
            .iter()
            .filter(|e| e.is_active(now))
            .filter_map(|e| pricing::boosted_category(e.kind))
            .collect();
        let multiplier =
            pricing::inflation_multiplier(state.indicators.inflation, cfg.inflation_weight);

        let MarketState {
            items, activity, ..
        } = &mut *state;
        let mut changed = false;
        for item in items {
            let act = activity
                .entry(item.id.clone())
                .or_insert_with(|| ItemActivity::new(now));
            act.prune(now);

            if let Some(decayed) = decay_demand(item.demand, act, now, cfg.demand_floor) {
                item.demand = decayed;
                item.last_update = now;
                report.demand_decayed.push(item.id.clone());
                changed = true;
            }

            if item.supply < cfg.restock_below {
                item.supply =
                    pricing::clamp_level(item.supply.saturating_add(cfg.restock_amount));
                item.last_update = now;
                report.restocked.push(item.id.clone());
                changed = true;
            }

            let delta = pricing::supply_demand_pressure(
                item.supply,
                item.demand,
                cfg.supply_demand_weight,
            )
            .saturating_add(pricing::market_force(
                act.volume(),
                item.average_volume,
                boosted.contains(&item.category),
                item.volatility,
                cfg,
            ));
            let next = pricing::next_price(item, delta, multiplier);
            if pricing::exceeds_threshold(item.current_price, next, cfg.update_threshold) {
                report.price_changes.push(PriceChange {
                    item_id: item.id.clone(),
                    previous_price: item.current_price,
                    new_price: next,
                });
                item.current_price = next;
                item.last_update = now;
                changed = true;
            }
        }

        if changed {
            self.persist_items(&state).await;
        }
        if !report.price_changes.is_empty() {
            self.bus
                .publish(ChangeEvent::PricesUpdated(report.price_changes.clone()), now);
        }

        debug!(
            repriced = report.price_changes.len(),
            restocked = report.restocked.len(),
            decayed = report.demand_decayed.len(),
            "Market tick complete"
        );
        report
    }

    // -----------------------------------------------------------------------
    // Indicators
    // -----------------------------------------------------------------------

    /// The current indicator set.
    pub async fn indicators(&self) -> EconomicIndicators {
        self.state.lock().await.indicators.clone()
    }

    /// Merge `patch` into the indicator set.
    ///
    /// Values are clamped into `0..=100` and `last_update` is always
    /// re-stamped, even for an empty patch.
    pub async fn update_indicators(&self, patch: IndicatorsPatch) -> EconomicIndicators {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let ind = &mut state.indicators;
        let fields = [
            (&mut ind.inflation, patch.inflation),
            (&mut ind.unemployment, patch.unemployment),
            (&mut ind.gross_output, patch.gross_output),
            (&mut ind.criminal_activity, patch.criminal_activity),
            (&mut ind.tourism, patch.tourism),
            (&mut ind.business_activity, patch.business_activity),
        ];
        for (field, value) in fields {
            if let Some(v) = value {
                *field = pricing::clamp_indicator(v);
            }
        }
        ind.last_update = now;
        let updated = ind.clone();

        let ttl = Some(self.settings.snapshot_ttl);
        if !self.cache.set_json(INDICATORS_KEY, &updated, ttl).await {
            warn!(key = INDICATORS_KEY, "Failed to write indicator snapshot");
        }
        info!(inflation = %updated.inflation, "Economic indicators updated");
        self.bus
            .publish(ChangeEvent::EconomicIndicatorsUpdated(updated.clone()), now);
        updated
    }

    // -----------------------------------------------------------------------
    // Read models
    // -----------------------------------------------------------------------

    /// An item by id.
    pub async fn get_item(&self, id: &ItemId) -> Option<MarketItem> {
        let state = self.state.lock().await;
        state.items.iter().find(|i| &i.id == id).cloned()
    }

    /// The full catalog, in seed order.
    pub async fn list_items(&self) -> Vec<MarketItem> {
        self.state.lock().await.items.clone()
    }

    /// Catalog items in `category`.
    pub async fn items_by_category(&self, category: ItemCategory) -> Vec<MarketItem> {
        let state = self.state.lock().await;
        state
            .items
            .iter()
            .filter(|i| i.category == category)
            .cloned()
            .collect()
    }

    /// Up to `limit` transactions, newest first.
    pub async fn recent_transactions(&self, limit: usize) -> Vec<Transaction> {
        let state = self.state.lock().await;
        state.transactions.iter().rev().take(limit).cloned().collect()
    }

    /// Up to `limit` transactions by `actor`, newest first.
    pub async fn actor_transactions(&self, actor: &ActorId, limit: usize) -> Vec<Transaction> {
        let state = self.state.lock().await;
        state
            .transactions
            .iter()
            .rev()
            .filter(|t| &t.actor_id == actor)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Aggregate prices and 24-hour volume, computed from memory.
    pub async fn stats(&self) -> MarketStats {
        let now = self.clock.now();
        let state = self.state.lock().await;
        let cutoff = now.checked_sub_signed(STATS_WINDOW).unwrap_or(DateTime::<Utc>::MIN_UTC);

        let price_sum = state
            .items
            .iter()
            .fold(Decimal::ZERO, |acc, i| acc.saturating_add(i.current_price));
        let average_price = mean(price_sum, Decimal::from(state.items.len()));

        let (volume, count) = state
            .transactions
            .iter()
            .filter(|t| t.timestamp > cutoff)
            .fold((Decimal::ZERO, 0_u32), |(v, n), t| {
                (v.saturating_add(t.amount), n.saturating_add(1))
            });
        let average_transaction_size = mean(volume, Decimal::from(count));

        MarketStats {
            item_count: u32::try_from(state.items.len()).unwrap_or(u32::MAX),
            average_price,
            volume_24h: volume,
            transactions_24h: count,
            average_transaction_size,
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    async fn persist_items(&self, state: &MarketState) {
        let ttl = Some(self.settings.snapshot_ttl);
        if !self.cache.set_json(ITEMS_KEY, &state.items, ttl).await {
            warn!(key = ITEMS_KEY, "Failed to write item snapshot");
        }
    }
}

/// `total / n`, rounded to cents; zero when `n` is zero.
fn mean(total: Decimal, n: Decimal) -> Decimal {
    if n.is_zero() {
        return Decimal::ZERO;
    }
    total.checked_div(n).map_or(Decimal::ZERO, |v| v.round_dp(2))
}

fn validate_trade(actor: &ActorId, quantity: u32) -> Result<()> {
    if actor.as_str().trim().is_empty() {
        return Err(MarketError::Validation(String::from("actor id is empty")));
    }
    if quantity == 0 {
        return Err(MarketError::Validation(String::from(
            "trade quantity must be positive",
        )));
    }
    Ok(())
}

fn total_cost(unit_price: Decimal, quantity: u32) -> Result<Decimal> {
    unit_price
        .checked_mul(Decimal::from(quantity))
        .ok_or_else(|| MarketError::Validation(format!("{quantity} x {unit_price} overflows")))
}

/// New demand after idle decay, or `None` if it does not move.
///
/// Demand loses one point per whole hour since the last purchase (or the
/// last decay), never going below `floor`. Demand already at or under the
/// floor is left alone.
fn decay_demand(
    demand: u32,
    activity: &mut ItemActivity,
    now: DateTime<Utc>,
    floor: u32,
) -> Option<u32> {
    let hours = now.signed_duration_since(activity.decay_from).num_hours();
    if hours < 1 {
        return None;
    }
    activity.decay_from = activity
        .decay_from
        .checked_add_signed(TimeDelta::hours(hours))
        .unwrap_or(now);
    if demand <= floor {
        return None;
    }
    let steps = u32::try_from(hours).unwrap_or(u32::MAX);
    Some(demand.saturating_sub(steps).max(floor))
}

fn trade_transaction(
    kind: TransactionKind,
    actor: &ActorId,
    item: &MarketItem,
    quantity: u32,
    unit_price: Decimal,
    total: Decimal,
    now: DateTime<Utc>,
) -> Transaction {
    let verb = match kind {
        TransactionKind::Sale => "Sold",
        _ => "Bought",
    };
    Transaction {
        id: TransactionId::new(),
        kind,
        actor_id: actor.clone(),
        item_id: Some(item.id.clone()),
        amount: total,
        description: format!("{verb} {quantity} x {} at {unit_price}", item.name),
        timestamp: now,
        metadata: serde_json::json!({
            "quantity": quantity,
            "unit_price": unit_price.to_string(),
        }),
    }
}
