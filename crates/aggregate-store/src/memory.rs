use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    AggregateId, IdGenerator, LedgerEntry, Result, SoftDelete, StoreError, UuidIdGenerator,
    Version, Versioned,
    store::{AggregateStore, SoftDeleteStore, TransactionLedger, ensure_next_version},
};

/// In-memory aggregate store.
///
/// Reference implementation of [`AggregateStore`]: each write takes the map's
/// write lock for the duration of the version check and replacement, so
/// concurrent updates against one identifier serialize and at most one of them
/// wins per version.
pub struct InMemoryAggregateStore<A> {
    entries: Arc<RwLock<HashMap<AggregateId, A>>>,
    ids: Arc<dyn IdGenerator>,
}

impl<A> Clone for InMemoryAggregateStore<A> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            ids: Arc::clone(&self.ids),
        }
    }
}

impl<A: Versioned> Default for InMemoryAggregateStore<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Versioned> InMemoryAggregateStore<A> {
    /// Creates an empty store handing out random UUIDs.
    pub fn new() -> Self {
        Self::with_id_generator(Arc::new(UuidIdGenerator))
    }

    /// Creates an empty store using the given identifier generator.
    pub fn with_id_generator(ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ids,
        }
    }

    /// Returns the number of stored aggregates, soft-deleted ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if nothing has been stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Returns the stored value even if it has been soft-deleted.
    pub async fn get_raw(&self, id: AggregateId) -> Option<A> {
        self.entries.read().await.get(&id).cloned()
    }
}

fn holds_key<A: Versioned>(aggregate: &A, key: &str, value: &str) -> bool {
    aggregate
        .unique_keys()
        .iter()
        .any(|k| k.name == key && k.value == value)
}

#[async_trait]
impl<A: Versioned> AggregateStore<A> for InMemoryAggregateStore<A> {
    fn next_id(&self) -> AggregateId {
        self.ids.next_id()
    }

    async fn create(&self, aggregate: A) -> Result<()> {
        let id = aggregate.id();
        let mut entries = self.entries.write().await;

        if entries.contains_key(&id) {
            return Err(StoreError::AlreadyExists {
                aggregate_type: A::aggregate_type(),
                id,
            });
        }

        ensure_next_version(
            A::aggregate_type(),
            id,
            Version::initial(),
            aggregate.version(),
        )?;

        for key in aggregate.unique_keys() {
            let taken = entries
                .values()
                .any(|existing| !existing.is_deleted() && holds_key(existing, key.name, &key.value));
            if taken {
                return Err(StoreError::DuplicateKey {
                    aggregate_type: A::aggregate_type(),
                    key: key.name,
                    value: key.value,
                });
            }
        }

        entries.insert(id, aggregate);
        Ok(())
    }

    async fn find(&self, id: AggregateId) -> Result<A> {
        let entries = self.entries.read().await;
        entries
            .get(&id)
            .filter(|a| !a.is_deleted())
            .cloned()
            .ok_or(StoreError::NotFound {
                aggregate_type: A::aggregate_type(),
                id,
            })
    }

    async fn find_by_key(&self, key: &'static str, value: &str) -> Result<Option<A>> {
        let entries = self.entries.read().await;
        Ok(entries
            .values()
            .find(|a| !a.is_deleted() && holds_key(*a, key, value))
            .cloned())
    }

    async fn update(&self, aggregate: A) -> Result<()> {
        let id = aggregate.id();
        let mut entries = self.entries.write().await;

        let stored = entries.get_mut(&id).ok_or(StoreError::NotFound {
            aggregate_type: A::aggregate_type(),
            id,
        })?;

        ensure_next_version(
            A::aggregate_type(),
            id,
            stored.version(),
            aggregate.version(),
        )?;

        *stored = aggregate;
        Ok(())
    }
}

#[async_trait]
impl<A: SoftDelete> SoftDeleteStore<A> for InMemoryAggregateStore<A> {
    async fn delete(&self, id: AggregateId) -> Result<()> {
        let mut entries = self.entries.write().await;

        match entries.get_mut(&id) {
            Some(stored) if !stored.is_deleted() => {
                stored.mark_deleted(Utc::now());
                Ok(())
            }
            _ => Err(StoreError::NotFound {
                aggregate_type: A::aggregate_type(),
                id,
            }),
        }
    }
}

/// In-memory transaction ledger layered over an [`InMemoryAggregateStore`].
///
/// The entry list lock is taken before the owner's store lock and held
/// across [`commit`](TransactionLedger::commit), so duplicate-reference
/// detection and the owner update happen as one step.
pub struct InMemoryLedger<A, E> {
    store: InMemoryAggregateStore<A>,
    entries: Arc<RwLock<Vec<E>>>,
}

impl<A, E> Clone for InMemoryLedger<A, E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<A: Versioned, E: LedgerEntry> InMemoryLedger<A, E> {
    /// Creates an empty ledger whose commits update `store`.
    pub fn new(store: InMemoryAggregateStore<A>) -> Self {
        Self {
            store,
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Returns every entry recorded for an owner, oldest first.
    pub async fn entries_for(&self, owner_id: AggregateId) -> Vec<E> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| e.owner_id() == owner_id)
            .cloned()
            .collect()
    }

    /// Returns the total number of recorded entries.
    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }
}

fn ensure_unsettled<E: LedgerEntry>(
    aggregate_type: &'static str,
    entries: &[E],
    entry: &E,
) -> Result<()> {
    if !entry.is_settled() {
        return Ok(());
    }
    let duplicate = entries.iter().any(|e| {
        e.is_settled() && e.owner_id() == entry.owner_id() && e.reference() == entry.reference()
    });
    if duplicate {
        return Err(StoreError::DuplicateKey {
            aggregate_type,
            key: "reference",
            value: entry.reference().to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl<A: Versioned, E: LedgerEntry> TransactionLedger<A, E> for InMemoryLedger<A, E> {
    async fn find_by_reference(
        &self,
        owner_id: AggregateId,
        reference: &str,
    ) -> Result<Option<E>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .find(|e| e.owner_id() == owner_id && e.reference() == reference)
            .cloned())
    }

    async fn append(&self, entry: E) -> Result<()> {
        let mut entries = self.entries.write().await;
        ensure_unsettled(A::aggregate_type(), &entries, &entry)?;
        entries.push(entry);
        Ok(())
    }

    async fn commit(&self, entry: E, aggregate: A) -> Result<()> {
        let mut entries = self.entries.write().await;
        ensure_unsettled(A::aggregate_type(), &entries, &entry)?;
        self.store.update(aggregate).await?;
        entries.push(entry);
        Ok(())
    }
}
