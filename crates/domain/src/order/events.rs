//! Order domain events.

use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::Money;
use crate::aggregate::DomainEvent;

/// Events that can occur on an order aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Order was created.
    OrderCreated {
        order_id: AggregateId,
        customer_id: AggregateId,
    },

    /// Item was added to the order.
    ItemAddedToOrder {
        order_id: AggregateId,
        item_id: AggregateId,
        product_id: AggregateId,
        price: Money,
    },

    /// Item was removed from the order.
    ItemRemovedFromOrder {
        order_id: AggregateId,
        item_id: AggregateId,
    },

    /// Order left Open and now waits for payment of `total`.
    OrderSubmittedForPayment { order_id: AggregateId, total: Money },

    /// Order was cancelled.
    OrderCancelled { order_id: AggregateId, reason: String },
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderCreated { .. } => "OrderCreated",
            OrderEvent::ItemAddedToOrder { .. } => "ItemAddedToOrder",
            OrderEvent::ItemRemovedFromOrder { .. } => "ItemRemovedFromOrder",
            OrderEvent::OrderSubmittedForPayment { .. } => "OrderSubmittedForPayment",
            OrderEvent::OrderCancelled { .. } => "OrderCancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_types() {
        let id = AggregateId::new();
        assert_eq!(
            OrderEvent::OrderCreated {
                order_id: id,
                customer_id: id
            }
            .event_type(),
            "OrderCreated"
        );
        assert_eq!(
            OrderEvent::OrderSubmittedForPayment {
                order_id: id,
                total: Money::from_minor(10)
            }
            .event_type(),
            "OrderSubmittedForPayment"
        );
    }

    #[test]
    fn test_serialization_is_adjacently_tagged() {
        let event = OrderEvent::OrderCancelled {
            order_id: AggregateId::new(),
            reason: "out of stock".to_string(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "OrderCancelled");
        assert_eq!(json["data"]["reason"], "out of stock");
    }
}
