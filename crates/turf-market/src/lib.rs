//! Market, pricing, and economic-indicator domain for the Turf simulation.
//!
//! The domain keeps the item catalog, economic indicators, and a bounded
//! transaction log in memory, moves actor balances through an external
//! ledger, reprices items on a fixed interval, and publishes every change
//! on the change bus.
//!
//! # Modules
//!
//! - [`domain`] -- [`MarketDomain`]: trading, indicators, periodic tick, stats
//! - [`pricing`] -- Pure pricing model (pressure, force, inflation, floor)
//! - [`catalog`] -- Default items and indicators seeded on first boot
//! - [`ledger`] -- [`BalanceLedger`] collaborator and [`InMemoryLedger`]
//! - [`error`] -- Request and ledger failures

pub mod catalog;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod pricing;

pub use domain::{
    INDICATORS_KEY, ITEMS_KEY, MarketDomain, MarketSettings, MarketTickReport,
    TRANSACTION_LOG_CAP, TradeReceipt,
};
pub use error::{LedgerError, MarketError};
pub use ledger::{BalanceLedger, InMemoryLedger};
