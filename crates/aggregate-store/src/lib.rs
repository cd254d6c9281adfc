//! Persistence for versioned aggregates.
//!
//! Every aggregate carries a [`Version`] that starts at 1 on creation and
//! grows by exactly one on each successful update. [`AggregateStore::update`]
//! only accepts a value whose version is the stored version plus one, which
//! turns every write into a compare-and-swap and surfaces lost updates as
//! [`StoreError::OptimisticLockConflict`].
//!
//! [`TransactionLedger`] is the append-only companion used for money
//! movement: entries are keyed by (owner, reference) so retried requests can
//! be recognised and short-circuited.

pub mod aggregate;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;
pub mod version;

pub use aggregate::{LedgerEntry, SoftDelete, UniqueKey, Versioned};
pub use common::{AggregateId, IdGenerator, SequentialIdGenerator, UuidIdGenerator};
pub use error::{Result, StoreError};
pub use memory::{InMemoryAggregateStore, InMemoryLedger};
pub use postgres::{PostgresAggregateStore, PostgresLedger, run_migrations};
pub use store::{AggregateStore, SoftDeleteStore, TransactionLedger, ensure_next_version};
pub use version::Version;
