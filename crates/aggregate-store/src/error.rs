use common::AggregateId;
use thiserror::Error;

use crate::Version;

/// Errors that can occur when interacting with an aggregate store or ledger.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The aggregate does not exist or has been soft-deleted.
    #[error("{aggregate_type} not found: {id}")]
    NotFound {
        aggregate_type: &'static str,
        id: AggregateId,
    },

    /// An aggregate with this identifier is already stored.
    #[error("{aggregate_type} already exists: {id}")]
    AlreadyExists {
        aggregate_type: &'static str,
        id: AggregateId,
    },

    /// Another live record already claims this unique key.
    #[error("{aggregate_type} with {key} '{value}' already exists")]
    DuplicateKey {
        aggregate_type: &'static str,
        key: &'static str,
        value: String,
    },

    /// The stored version is not the one the caller loaded.
    #[error(
        "Optimistic lock conflict for {aggregate_type} {id}: expected version {expected}, found {actual}"
    )]
    OptimisticLockConflict {
        aggregate_type: &'static str,
        id: AggregateId,
        expected: Version,
        actual: Version,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns true if the caller should reload and retry.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::OptimisticLockConflict { .. })
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
