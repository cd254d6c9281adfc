//! Product domain events.

use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::Money;
use crate::aggregate::DomainEvent;

/// Events that can occur on a product aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ProductEvent {
    ProductCreated {
        product_id: AggregateId,
        name: String,
    },

    ProductPriceChanged {
        product_id: AggregateId,
        old_price: Money,
        new_price: Money,
    },

    /// Stock moved by `delta`: positive when received, negative when reserved.
    ProductStockChanged {
        product_id: AggregateId,
        delta: i64,
        new_quantity: i64,
    },

    ProductArchived {
        product_id: AggregateId,
    },
}

impl DomainEvent for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductCreated { .. } => "ProductCreated",
            ProductEvent::ProductPriceChanged { .. } => "ProductPriceChanged",
            ProductEvent::ProductStockChanged { .. } => "ProductStockChanged",
            ProductEvent::ProductArchived { .. } => "ProductArchived",
        }
    }
}
