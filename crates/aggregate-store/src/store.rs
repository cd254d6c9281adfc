use std::sync::Arc;

use async_trait::async_trait;
use common::AggregateId;

use crate::{LedgerEntry, Result, SoftDelete, StoreError, Version, Versioned};

/// Core trait for aggregate store implementations.
///
/// A store owns the canonical copy of every aggregate of type `A`. Callers
/// only ever receive clones; the only way to change stored state is
/// [`update`](AggregateStore::update), which is guarded by the version
/// precondition. The store never retries on the caller's behalf.
#[async_trait]
pub trait AggregateStore<A: Versioned>: Send + Sync {
    /// Allocates a fresh identifier for an aggregate that does not exist yet.
    fn next_id(&self) -> AggregateId;

    /// Inserts a new aggregate.
    ///
    /// The aggregate must carry [`Version::first`]. Fails with `AlreadyExists`
    /// if the identifier is taken and with `DuplicateKey` if a live aggregate
    /// already holds one of its unique keys.
    async fn create(&self, aggregate: A) -> Result<()>;

    /// Loads an aggregate by identifier.
    ///
    /// Fails with `NotFound` if it is absent or soft-deleted.
    async fn find(&self, id: AggregateId) -> Result<A>;

    /// Loads a live aggregate by one of its unique keys.
    async fn find_by_key(&self, key: &'static str, value: &str) -> Result<Option<A>>;

    /// Replaces a stored aggregate.
    ///
    /// Succeeds only if the stored version is exactly one less than
    /// `aggregate.version()`; otherwise fails with `OptimisticLockConflict`
    /// and leaves the stored value untouched.
    async fn update(&self, aggregate: A) -> Result<()>;
}

/// Stores for aggregates that can be soft-deleted.
#[async_trait]
pub trait SoftDeleteStore<A: SoftDelete>: AggregateStore<A> {
    /// Stamps the deletion time in place. The version does not change.
    ///
    /// Fails with `NotFound` if the aggregate is absent or already deleted.
    async fn delete(&self, id: AggregateId) -> Result<()>;
}

/// Append-only ledger of entries of type `E` belonging to aggregates of
/// type `A`.
#[async_trait]
pub trait TransactionLedger<A: Versioned, E: LedgerEntry>: Send + Sync {
    /// Returns the entry recorded for (owner, reference), if any.
    async fn find_by_reference(&self, owner_id: AggregateId, reference: &str)
    -> Result<Option<E>>;

    /// Records a new entry without touching the owner.
    ///
    /// Fails with `DuplicateKey` if `entry` is settled and a settled entry
    /// already exists for the same (owner, reference).
    async fn append(&self, entry: E) -> Result<()>;

    /// Records `entry` and applies the versioned update of its owner as one
    /// step. If either part fails, neither is visible.
    async fn commit(&self, entry: E, aggregate: A) -> Result<()>;
}

#[async_trait]
impl<A: Versioned, S: AggregateStore<A> + ?Sized> AggregateStore<A> for Arc<S> {
    fn next_id(&self) -> AggregateId {
        (**self).next_id()
    }

    async fn create(&self, aggregate: A) -> Result<()> {
        (**self).create(aggregate).await
    }

    async fn find(&self, id: AggregateId) -> Result<A> {
        (**self).find(id).await
    }

    async fn find_by_key(&self, key: &'static str, value: &str) -> Result<Option<A>> {
        (**self).find_by_key(key, value).await
    }

    async fn update(&self, aggregate: A) -> Result<()> {
        (**self).update(aggregate).await
    }
}

#[async_trait]
impl<A: SoftDelete, S: SoftDeleteStore<A> + ?Sized> SoftDeleteStore<A> for Arc<S> {
    async fn delete(&self, id: AggregateId) -> Result<()> {
        (**self).delete(id).await
    }
}

#[async_trait]
impl<A, E, L> TransactionLedger<A, E> for Arc<L>
where
    A: Versioned,
    E: LedgerEntry,
    L: TransactionLedger<A, E> + ?Sized,
{
    async fn find_by_reference(
        &self,
        owner_id: AggregateId,
        reference: &str,
    ) -> Result<Option<E>> {
        (**self).find_by_reference(owner_id, reference).await
    }

    async fn append(&self, entry: E) -> Result<()> {
        (**self).append(entry).await
    }

    async fn commit(&self, entry: E, aggregate: A) -> Result<()> {
        (**self).commit(entry, aggregate).await
    }
}

/// The compare-and-swap precondition shared by every backend: an incoming
/// snapshot must be exactly one version ahead of what is stored.
///
/// `stored` is [`Version::initial`] when checking a create.
pub fn ensure_next_version(
    aggregate_type: &'static str,
    id: AggregateId,
    stored: Version,
    incoming: Version,
) -> Result<()> {
    if stored.next() == incoming {
        return Ok(());
    }

    metrics::counter!("aggregate_store_conflicts_total", "aggregate_type" => aggregate_type)
        .increment(1);
    tracing::debug!(
        aggregate_type,
        %id,
        %stored,
        %incoming,
        "version precondition failed"
    );

    Err(StoreError::OptimisticLockConflict {
        aggregate_type,
        id,
        expected: incoming.previous(),
        actual: stored,
    })
}
