//! Wallet aggregate and ledger transaction records.

use aggregate_store::{LedgerEntry, UniqueKey, Version, Versioned};
use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::Money;
use crate::aggregate::Aggregate;

use super::{WalletError, WalletEvent};

/// Currency tag given to new wallets unless configured otherwise.
pub const DEFAULT_CURRENCY: &str = "INTERNAL_COIN";

/// Wallet aggregate root. One wallet per owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    id: AggregateId,
    version: Version,
    owner_id: AggregateId,
    balance: Money,
    currency: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Opens an empty wallet at version 1.
    pub fn open(id: AggregateId, owner_id: AggregateId, currency: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            version: Version::first(),
            owner_id,
            balance: Money::zero(),
            currency: currency.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn owner_id(&self) -> AggregateId {
        self.owner_id
    }

    pub fn balance(&self) -> Money {
        self.balance
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Moves `amount` in or out of the balance. A withdrawal larger than the
    /// balance, or a deposit the balance cannot hold, is refused and leaves
    /// the wallet untouched.
    pub fn apply(&mut self, kind: TransactionKind, amount: Money) -> Result<(), WalletError> {
        let balance = match kind {
            TransactionKind::Deposit => self.balance.checked_add(amount).ok_or(
                WalletError::BalanceOverflow {
                    balance: self.balance,
                    amount,
                },
            )?,
            TransactionKind::Withdrawal => self
                .balance
                .checked_sub(amount)
                .filter(|rest| !rest.is_negative())
                .ok_or(WalletError::InsufficientFunds {
                    balance: self.balance,
                    requested: amount,
                })?,
        };
        self.balance = balance;
        Ok(())
    }
}

impl Versioned for Wallet {
    fn aggregate_type() -> &'static str {
        "Wallet"
    }

    fn id(&self) -> AggregateId {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::new("owner", self.owner_id.to_string())]
    }
}

impl Aggregate for Wallet {
    type Event = WalletEvent;
    type Error = WalletError;

    fn advance(&mut self, at: DateTime<Utc>) {
        self.version = self.version.next();
        self.updated_at = at;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    Pending,
    Committed,
    Failed,
}

/// A monetary operation against a wallet, keyed by the caller's reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: AggregateId,
    pub wallet_id: AggregateId,
    pub kind: TransactionKind,
    pub amount: Money,
    pub reference: String,
    pub status: TransactionStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn pending(
        id: AggregateId,
        wallet_id: AggregateId,
        kind: TransactionKind,
        amount: Money,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            id,
            wallet_id,
            kind,
            amount,
            reference: reference.into(),
            status: TransactionStatus::Pending,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    pub fn committed(mut self) -> Self {
        self.status = TransactionStatus::Committed;
        self
    }

    pub fn failed(mut self, reason: impl Into<String>) -> Self {
        self.status = TransactionStatus::Failed;
        self.error_message = Some(reason.into());
        self
    }
}

impl LedgerEntry for Transaction {
    fn id(&self) -> AggregateId {
        self.id
    }

    fn owner_id(&self) -> AggregateId {
        self.wallet_id
    }

    fn reference(&self) -> &str {
        &self.reference
    }

    fn is_settled(&self) -> bool {
        self.status != TransactionStatus::Pending
    }
}
