//! Wallet service: deposits and order payments with idempotent references.

use std::sync::Arc;

use aggregate_store::{AggregateStore, StoreError, TransactionLedger, Versioned};
use chrono::Utc;
use common::AggregateId;

use crate::Money;
use crate::aggregate::Aggregate;
use crate::dispatch::{EventDispatcher, publish};
use crate::error::DomainError;

use super::{
    DEFAULT_CURRENCY, INSUFFICIENT_FUNDS, Transaction, TransactionKind, Wallet, WalletError,
    WalletEvent,
};

/// Service for wallets and money movement.
///
/// Every monetary command carries a caller-supplied reference. The first
/// request for a (wallet, reference) pair settles it; any later request with
/// the same pair returns the current wallet unchanged and dispatches nothing.
pub struct WalletService<S, L> {
    store: S,
    ledger: L,
    dispatcher: Arc<dyn EventDispatcher>,
    currency: String,
}

impl<S, L> WalletService<S, L>
where
    S: AggregateStore<Wallet>,
    L: TransactionLedger<Wallet, Transaction>,
{
    /// Creates a service whose ledger commits wallet updates into `store`.
    pub fn new(store: S, ledger: L, dispatcher: Arc<dyn EventDispatcher>) -> Self {
        Self {
            store,
            ledger,
            dispatcher,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    /// Sets the currency tag given to new wallets.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Opens an empty wallet for an owner.
    #[tracing::instrument(skip(self))]
    pub async fn create_wallet(&self, owner_id: AggregateId) -> Result<Wallet, DomainError> {
        let wallet = Wallet::open(self.store.next_id(), owner_id, self.currency.as_str());

        match self.store.create(wallet.clone()).await {
            Ok(()) => Ok(wallet),
            Err(StoreError::DuplicateKey { .. }) => {
                Err(WalletError::WalletAlreadyExists { owner_id }.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Adds funds to the owner's wallet. A deposit the balance cannot hold
    /// is rejected without touching the ledger.
    #[tracing::instrument(skip(self))]
    pub async fn deposit(
        &self,
        owner_id: AggregateId,
        amount: Money,
        reference: &str,
    ) -> Result<Wallet, DomainError> {
        ensure_positive(amount)?;
        self.process(owner_id, TransactionKind::Deposit, amount, reference)
            .await
    }

    /// Withdraws the order amount, using the order id as the reference.
    ///
    /// An overdraft is recorded as a failed transaction and announced with
    /// `PaymentFailed` before `InsufficientFunds` is returned.
    #[tracing::instrument(skip(self))]
    pub async fn pay_for_order(
        &self,
        owner_id: AggregateId,
        order_id: AggregateId,
        amount: Money,
    ) -> Result<Wallet, DomainError> {
        ensure_positive(amount)?;
        self.process(
            owner_id,
            TransactionKind::Withdrawal,
            amount,
            &order_id.to_string(),
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_balance(&self, owner_id: AggregateId) -> Result<Money, DomainError> {
        Ok(self.wallet_for(owner_id).await?.balance())
    }

    pub async fn get_wallet(&self, owner_id: AggregateId) -> Result<Wallet, DomainError> {
        self.wallet_for(owner_id).await
    }

    /// Returns the transaction recorded for a reference, if any.
    pub async fn find_transaction(
        &self,
        owner_id: AggregateId,
        reference: &str,
    ) -> Result<Option<Transaction>, DomainError> {
        let wallet = self.wallet_for(owner_id).await?;
        Ok(self.ledger.find_by_reference(wallet.id(), reference).await?)
    }

    async fn wallet_for(&self, owner_id: AggregateId) -> Result<Wallet, DomainError> {
        self.store
            .find_by_key("owner", &owner_id.to_string())
            .await?
            .ok_or_else(|| WalletError::WalletNotFound { owner_id }.into())
    }

    async fn process(
        &self,
        owner_id: AggregateId,
        kind: TransactionKind,
        amount: Money,
        reference: &str,
    ) -> Result<Wallet, DomainError> {
        let wallet = self.wallet_for(owner_id).await?;

        if self
            .ledger
            .find_by_reference(wallet.id(), reference)
            .await?
            .is_some()
        {
            return Ok(self.repeated(wallet, reference));
        }

        let tx = Transaction::pending(self.store.next_id(), wallet.id(), kind, amount, reference);
        let mut next = wallet.clone();

        if let Err(refusal) = next.apply(kind, amount) {
            if !matches!(refusal, WalletError::InsufficientFunds { .. }) {
                return Err(refusal.into());
            }

            match self.ledger.append(tx.failed(INSUFFICIENT_FUNDS)).await {
                Ok(()) => {}
                Err(StoreError::DuplicateKey { .. }) => {
                    return self.repeated_after_race(owner_id, reference).await;
                }
                Err(e) => return Err(e.into()),
            }

            metrics::counter!("wallet_payment_failures_total").increment(1);
            tracing::info!(wallet_id = %wallet.id(), reference, "payment refused");
            publish(
                self.dispatcher.as_ref(),
                [WalletEvent::PaymentFailed {
                    wallet_id: wallet.id(),
                    reference: reference.to_string(),
                    reason: INSUFFICIENT_FUNDS.to_string(),
                }],
            )
            .await;

            return Err(refusal.into());
        }

        next.advance(Utc::now());
        match self.ledger.commit(tx.committed(), next.clone()).await {
            Ok(()) => {}
            Err(StoreError::DuplicateKey { .. }) => {
                return self.repeated_after_race(owner_id, reference).await;
            }
            Err(e) => return Err(e.into()),
        }

        let event = match kind {
            TransactionKind::Deposit => WalletEvent::FundsDeposited {
                wallet_id: next.id(),
                user_id: owner_id,
                amount,
                reference: reference.to_string(),
                new_balance: next.balance(),
            },
            TransactionKind::Withdrawal => WalletEvent::FundsWithdrawn {
                wallet_id: next.id(),
                user_id: owner_id,
                amount,
                reference: reference.to_string(),
            },
        };
        publish(self.dispatcher.as_ref(), [event]).await;

        Ok(next)
    }

    fn repeated(&self, wallet: Wallet, reference: &str) -> Wallet {
        metrics::counter!("wallet_duplicate_requests_total").increment(1);
        tracing::debug!(wallet_id = %wallet.id(), reference, "reference already settled");
        wallet
    }

    /// A concurrent request settled the reference between our lookup and
    /// our write. Report it as a repeat with the wallet as it is now.
    async fn repeated_after_race(
        &self,
        owner_id: AggregateId,
        reference: &str,
    ) -> Result<Wallet, DomainError> {
        let wallet = self.wallet_for(owner_id).await?;
        Ok(self.repeated(wallet, reference))
    }
}

fn ensure_positive(amount: Money) -> Result<(), WalletError> {
    if !amount.is_positive() {
        return Err(WalletError::InvalidAmount { amount });
    }
    Ok(())
}
