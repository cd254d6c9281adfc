//! Domain error types.

use aggregate_store::StoreError;
use thiserror::Error;

use crate::notification::NotificationError;
use crate::order::OrderError;
use crate::product::ProductError;
use crate::user::UserError;
use crate::wallet::WalletError;

/// Coarse classification of every failure a service can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The aggregate does not exist or has been soft-deleted.
    NotFound,
    /// Creating something whose identity or unique key is taken.
    AlreadyExists,
    /// Another writer got there first; reload and retry.
    OptimisticLockConflict,
    /// A caller-supplied value violates a static precondition.
    InvalidInput,
    /// The aggregate's current status does not allow the operation.
    IllegalStateTransition,
    /// The operation is well-formed but the business rules refuse it.
    BusinessRuleViolation,
    /// Storage, serialization or another collaborator failed.
    Infrastructure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::OptimisticLockConflict => "optimistic_lock_conflict",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::IllegalStateTransition => "illegal_state_transition",
            ErrorKind::BusinessRuleViolation => "business_rule_violation",
            ErrorKind::Infrastructure => "infrastructure",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the aggregate store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("Product error: {0}")]
    Product(#[from] ProductError),

    #[error("User error: {0}")]
    User(#[from] UserError),

    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Store(e) => store_kind(e),
            DomainError::Order(e) => e.kind(),
            DomainError::Wallet(e) => e.kind(),
            DomainError::Product(e) => e.kind(),
            DomainError::User(e) => e.kind(),
            DomainError::Notification(e) => e.kind(),
        }
    }

    /// Returns true if the whole operation may succeed when re-run.
    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::OptimisticLockConflict
    }
}

fn store_kind(error: &StoreError) -> ErrorKind {
    match error {
        StoreError::NotFound { .. } => ErrorKind::NotFound,
        StoreError::AlreadyExists { .. } | StoreError::DuplicateKey { .. } => {
            ErrorKind::AlreadyExists
        }
        StoreError::OptimisticLockConflict { .. } => ErrorKind::OptimisticLockConflict,
        StoreError::Database(_) | StoreError::Serialization(_) => ErrorKind::Infrastructure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aggregate_store::Version;
    use common::AggregateId;

    #[test]
    fn store_errors_map_to_kinds() {
        let conflict: DomainError = StoreError::OptimisticLockConflict {
            aggregate_type: "Order",
            id: AggregateId::new(),
            expected: Version::new(1),
            actual: Version::new(2),
        }
        .into();
        assert_eq!(conflict.kind(), ErrorKind::OptimisticLockConflict);
        assert!(conflict.is_conflict());

        let missing: DomainError = StoreError::NotFound {
            aggregate_type: "Order",
            id: AggregateId::new(),
        }
        .into();
        assert_eq!(missing.kind(), ErrorKind::NotFound);
        assert!(!missing.is_conflict());
    }

    #[test]
    fn aggregate_errors_keep_their_kind() {
        let err: DomainError = OrderError::OrderEmpty.into();
        assert_eq!(err.kind(), ErrorKind::BusinessRuleViolation);

        let err: DomainError = WalletError::InvalidAmount {
            amount: crate::Money::zero(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn kind_display() {
        assert_eq!(ErrorKind::IllegalStateTransition.to_string(), "illegal_state_transition");
    }
}
