//! Traits a type implements to be kept in an aggregate store or ledger.

use chrono::{DateTime, Utc};
use common::AggregateId;

use crate::Version;

/// A secondary key that must be unique among live aggregates of one type,
/// such as a user's email or a wallet's owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniqueKey {
    pub name: &'static str,
    pub value: String,
}

impl UniqueKey {
    pub fn new(name: &'static str, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

/// An aggregate snapshot that can be persisted with a version precondition.
pub trait Versioned: Clone + Send + Sync + 'static {
    /// Aggregate type name, used for storage partitioning, logs and metrics.
    fn aggregate_type() -> &'static str;

    /// Identifier assigned at creation.
    fn id(&self) -> AggregateId;

    /// Version carried by this snapshot.
    fn version(&self) -> Version;

    /// Soft-deleted aggregates stay in storage but are hidden from lookups.
    fn is_deleted(&self) -> bool {
        false
    }

    /// Secondary keys this aggregate can be looked up by.
    fn unique_keys(&self) -> Vec<UniqueKey> {
        Vec::new()
    }
}

/// Aggregates that support soft deletion.
pub trait SoftDelete: Versioned {
    /// Stamps the deletion time. Must not touch the version.
    fn mark_deleted(&mut self, at: DateTime<Utc>);
}

/// A record in an append-only ledger keyed by (owner, reference).
pub trait LedgerEntry: Clone + Send + Sync + 'static {
    /// Identifier of the record itself.
    fn id(&self) -> AggregateId;

    /// Aggregate the record belongs to.
    fn owner_id(&self) -> AggregateId;

    /// Caller-supplied idempotency reference.
    fn reference(&self) -> &str;

    /// True once the record reached a final outcome. At most one settled
    /// record may exist per (owner, reference).
    fn is_settled(&self) -> bool;
}
