//! Product catalogue aggregate and related types.

mod aggregate;
mod events;
mod service;

pub use aggregate::{Product, ProductStatus};
pub use events::ProductEvent;
pub use service::ProductService;

use thiserror::Error;

use crate::Money;
use crate::error::ErrorKind;

/// Errors that can occur during product operations.
#[derive(Debug, Error)]
pub enum ProductError {
    /// Prices are never negative.
    #[error("Invalid price: {price} (must not be negative)")]
    InvalidPrice { price: Money },

    /// Stock adjustments must be positive, and initial stock non-negative.
    #[error("Invalid stock quantity: {quantity}")]
    InvalidStockQuantity { quantity: i64 },

    /// The product's status does not allow the operation.
    #[error("Product is not available: cannot {action} while {status}")]
    ProductNotAvailable {
        status: ProductStatus,
        action: &'static str,
    },

    /// The reservation would drive stock below zero.
    #[error("Insufficient stock: {available} available, {requested} requested")]
    InsufficientStock { available: i64, requested: i64 },
}

impl ProductError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProductError::InvalidPrice { .. } | ProductError::InvalidStockQuantity { .. } => {
                ErrorKind::InvalidInput
            }
            ProductError::ProductNotAvailable { .. } => ErrorKind::IllegalStateTransition,
            ProductError::InsufficientStock { .. } => ErrorKind::BusinessRuleViolation,
        }
    }
}
