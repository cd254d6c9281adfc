//! Wallet domain events.

use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::Money;
use crate::aggregate::DomainEvent;

/// Events that can occur on a wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WalletEvent {
    FundsDeposited {
        wallet_id: AggregateId,
        user_id: AggregateId,
        amount: Money,
        reference: String,
        new_balance: Money,
    },

    FundsWithdrawn {
        wallet_id: AggregateId,
        user_id: AggregateId,
        amount: Money,
        reference: String,
    },

    /// A withdrawal was refused and recorded as failed.
    PaymentFailed {
        wallet_id: AggregateId,
        reference: String,
        reason: String,
    },
}

impl DomainEvent for WalletEvent {
    fn event_type(&self) -> &'static str {
        match self {
            WalletEvent::FundsDeposited { .. } => "FundsDeposited",
            WalletEvent::FundsWithdrawn { .. } => "FundsWithdrawn",
            WalletEvent::PaymentFailed { .. } => "PaymentFailed",
        }
    }
}
