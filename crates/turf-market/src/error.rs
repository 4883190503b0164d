//! Error types for the `turf-market` crate.

use rust_decimal::Decimal;
use turf_types::{ActorId, ItemId};

/// Request failures reported by [`MarketDomain`](crate::MarketDomain).
///
/// A failed request never leaves a partial mutation behind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarketError {
    /// No catalog item has the given id.
    #[error("item not found: {0}")]
    ItemNotFound(ItemId),

    /// The ledger has no account for the actor.
    #[error("actor not found: {0}")]
    ActorNotFound(ActorId),

    /// The actor cannot cover the purchase.
    #[error("insufficient funds for {actor}: required {required}, available {available}")]
    InsufficientFunds {
        /// The buyer.
        actor: ActorId,
        /// Total cost of the purchase.
        required: Decimal,
        /// Balance at the time of the check.
        available: Decimal,
    },

    /// The request was malformed.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The ledger refused or failed an operation after the fund check.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Failures raised by a [`BalanceLedger`](crate::BalanceLedger).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The ledger has no account for the actor.
    #[error("unknown actor: {0}")]
    UnknownActor(ActorId),

    /// A debit would take the balance below zero.
    #[error("insufficient balance for {actor}: requested {requested}, available {available}")]
    InsufficientFunds {
        /// The account.
        actor: ActorId,
        /// Amount requested.
        requested: Decimal,
        /// Balance at the time of the request.
        available: Decimal,
    },

    /// A credit would overflow the balance.
    #[error("balance overflow for {0}")]
    Overflow(ActorId),

    /// The ledger backend could not be reached.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

impl MarketError {
    /// Map a ledger failure onto the request taxonomy.
    pub fn from_ledger(err: LedgerError) -> Self {
        match err {
            LedgerError::UnknownActor(actor) => Self::ActorNotFound(actor),
            LedgerError::InsufficientFunds {
                actor,
                requested,
                available,
            } => Self::InsufficientFunds {
                actor,
                required: requested,
                available,
            },
            other => Self::Ledger(other),
        }
    }
}

/// Convenience alias for market results.
pub type Result<T> = core::result::Result<T, MarketError>;
