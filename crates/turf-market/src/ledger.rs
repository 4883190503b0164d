//! Actor balances.
//!
//! Balances live outside this core. The market domain reaches them through
//! [`BalanceLedger`]; [`InMemoryLedger`] is the process-local
//! implementation used by the engine's default wiring and by tests.
//!
//! All amounts are [`Decimal`] and every balance change is checked: a
//! debit never takes a balance below zero and a credit never overflows.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use rust_decimal::Decimal;
use turf_types::ActorId;

use crate::error::LedgerError;

/// Read and move actor balances.
#[async_trait]
pub trait BalanceLedger: Send + Sync {
    /// Current balance of `actor`.
    async fn balance(&self, actor: &ActorId) -> Result<Decimal, LedgerError>;

    /// Take `amount` from `actor`. Returns the new balance.
    async fn debit(&self, actor: &ActorId, amount: Decimal) -> Result<Decimal, LedgerError>;

    /// Give `amount` to `actor`. Returns the new balance.
    async fn credit(&self, actor: &ActorId, amount: Decimal) -> Result<Decimal, LedgerError>;
}

/// A ledger held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    balances: Mutex<HashMap<ActorId, Decimal>>,
}

impl InMemoryLedger {
    /// An empty ledger with no accounts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style: open `actor` with `balance`.
    #[must_use]
    pub fn with_balance(self, actor: impl Into<ActorId>, balance: Decimal) -> Self {
        self.open_account(actor.into(), balance);
        self
    }

    /// Open (or reset) an account.
    pub fn open_account(&self, actor: ActorId, balance: Decimal) {
        self.balances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(actor, balance);
    }

    /// Number of open accounts.
    pub fn account_count(&self) -> usize {
        self.balances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl BalanceLedger for InMemoryLedger {
    async fn balance(&self, actor: &ActorId) -> Result<Decimal, LedgerError> {
        self.balances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(actor)
            .copied()
            .ok_or_else(|| LedgerError::UnknownActor(actor.clone()))
    }

    async fn debit(&self, actor: &ActorId, amount: Decimal) -> Result<Decimal, LedgerError> {
        let mut balances = self.balances.lock().unwrap_or_else(PoisonError::into_inner);
        let balance = balances
            .get_mut(actor)
            .ok_or_else(|| LedgerError::UnknownActor(actor.clone()))?;
        let remaining = balance
            .checked_sub(amount)
            .filter(|r| *r >= Decimal::ZERO)
            .ok_or_else(|| LedgerError::InsufficientFunds {
                actor: actor.clone(),
                requested: amount,
                available: *balance,
            })?;
        *balance = remaining;
        Ok(remaining)
    }

    async fn credit(&self, actor: &ActorId, amount: Decimal) -> Result<Decimal, LedgerError> {
        let mut balances = self.balances.lock().unwrap_or_else(PoisonError::into_inner);
        let balance = balances
            .get_mut(actor)
            .ok_or_else(|| LedgerError::UnknownActor(actor.clone()))?;
        let total = balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(actor.clone()))?;
        *balance = total;
        Ok(total)
    }
}
