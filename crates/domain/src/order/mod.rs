//! Order aggregate and related types.

mod aggregate;
mod events;
mod service;
mod state;

pub use aggregate::{Order, OrderItem};
pub use events::OrderEvent;
pub use service::OrderService;
pub use state::OrderStatus;

use common::AggregateId;
use thiserror::Error;

use crate::Money;
use crate::error::ErrorKind;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Order is not in a status that allows the action.
    #[error("Order cannot be modified: cannot {action} from {status} status")]
    OrderCannotBeModified {
        status: OrderStatus,
        action: &'static str,
    },

    /// Item not found in order.
    #[error("Item not found: {item_id}")]
    ItemNotFound { item_id: AggregateId },

    /// The price is negative, or the order total could not hold it.
    #[error("Invalid price: {price} (must not be negative or overflow the total)")]
    InvalidPrice { price: Money },

    /// Order has no items.
    #[error("Order has no items")]
    OrderEmpty,
}

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::OrderCannotBeModified { .. } => ErrorKind::IllegalStateTransition,
            OrderError::InvalidPrice { .. } => ErrorKind::InvalidInput,
            OrderError::ItemNotFound { .. } | OrderError::OrderEmpty => {
                ErrorKind::BusinessRuleViolation
            }
        }
    }
}
