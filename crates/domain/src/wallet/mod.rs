//! Wallets, their transaction ledger and the payment service.

mod aggregate;
mod events;
mod service;

pub use aggregate::{
    DEFAULT_CURRENCY, Transaction, TransactionKind, TransactionStatus, Wallet,
};
pub use events::WalletEvent;
pub use service::WalletService;

use common::AggregateId;
use thiserror::Error;

use crate::Money;
use crate::error::ErrorKind;

/// Reason recorded on failed withdrawals.
pub const INSUFFICIENT_FUNDS: &str = "insufficient funds";

/// Errors that can occur during wallet operations.
#[derive(Debug, Error)]
pub enum WalletError {
    /// Monetary amounts must be strictly positive.
    #[error("Invalid amount: {amount} (must be greater than 0)")]
    InvalidAmount { amount: Money },

    /// The deposit would take the balance past what an amount can hold.
    #[error("Balance overflow: balance {balance}, deposit {amount}")]
    BalanceOverflow { balance: Money, amount: Money },

    /// The withdrawal exceeds the balance.
    #[error("Insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: Money, requested: Money },

    /// The owner has no wallet.
    #[error("Wallet not found for owner {owner_id}")]
    WalletNotFound { owner_id: AggregateId },

    /// The owner already has a wallet.
    #[error("Wallet already exists for owner {owner_id}")]
    WalletAlreadyExists { owner_id: AggregateId },
}

impl WalletError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WalletError::InvalidAmount { .. } | WalletError::BalanceOverflow { .. } => {
                ErrorKind::InvalidInput
            }
            WalletError::InsufficientFunds { .. } => ErrorKind::BusinessRuleViolation,
            WalletError::WalletNotFound { .. } => ErrorKind::NotFound,
            WalletError::WalletAlreadyExists { .. } => ErrorKind::AlreadyExists,
        }
    }
}
