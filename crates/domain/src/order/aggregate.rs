//! Order aggregate implementation.

use aggregate_store::{SoftDelete, Version, Versioned};
use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::Money;
use crate::aggregate::{Aggregate, Decision};

use super::{OrderError, OrderEvent, OrderStatus};

/// A line in an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Identifier allocated when the item was added.
    pub id: AggregateId,

    /// The product being ordered.
    pub product_id: AggregateId,

    /// Price at the time of adding.
    pub price: Money,
}

/// Order aggregate root.
///
/// Represents an order from creation through payment or cancellation. The
/// total is always the sum of the current item prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: AggregateId,
    version: Version,
    customer_id: AggregateId,
    status: OrderStatus,
    items: Vec<OrderItem>,
    total: Money,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Creates an empty open order at version 1.
    pub fn new(id: AggregateId, customer_id: AggregateId) -> Self {
        let now = Utc::now();
        Self {
            id,
            version: Version::first(),
            customer_id,
            status: OrderStatus::Open,
            items: Vec::new(),
            total: Money::zero(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

// Query methods
impl Order {
    pub fn customer_id(&self) -> AggregateId {
        self.customer_id
    }

    /// Returns the current status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns the items in the order they were added.
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Returns an item by its identifier.
    pub fn get_item(&self, item_id: AggregateId) -> Option<&OrderItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn has_items(&self) -> bool {
        !self.items.is_empty()
    }

    /// Returns true if the order is in a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

// Command methods
impl Order {
    /// Adds an item to an open order.
    pub fn add_item(
        &mut self,
        item_id: AggregateId,
        product_id: AggregateId,
        price: Money,
    ) -> Result<Decision<OrderEvent>, OrderError> {
        if price.is_negative() {
            return Err(OrderError::InvalidPrice { price });
        }
        self.ensure(self.status.can_modify_items(), "add item")?;

        let item = OrderItem {
            id: item_id,
            product_id,
            price,
        };
        let total = total_of(self.items.iter().chain([&item]))
            .ok_or(OrderError::InvalidPrice { price })?;
        self.items.push(item);
        self.total = total;

        Ok(Decision::emit(OrderEvent::ItemAddedToOrder {
            order_id: self.id,
            item_id,
            product_id,
            price,
        }))
    }

    /// Removes an item from an open order.
    pub fn remove_item(&mut self, item_id: AggregateId) -> Result<Decision<OrderEvent>, OrderError> {
        self.ensure(self.status.can_modify_items(), "remove item")?;

        let index = self
            .items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or(OrderError::ItemNotFound { item_id })?;

        let remaining = self
            .items
            .iter()
            .enumerate()
            .filter(|(position, _)| *position != index)
            .map(|(_, item)| item);
        let total = total_of(remaining).ok_or(OrderError::InvalidPrice {
            price: self.items[index].price,
        })?;
        self.items.remove(index);
        self.total = total;

        Ok(Decision::emit(OrderEvent::ItemRemovedFromOrder {
            order_id: self.id,
            item_id,
        }))
    }

    /// Moves an open, non-empty order to Pending.
    pub fn submit_for_payment(&mut self) -> Result<Decision<OrderEvent>, OrderError> {
        self.ensure(self.status.can_submit(), "submit")?;
        if !self.has_items() {
            return Err(OrderError::OrderEmpty);
        }

        self.status = OrderStatus::Pending;

        Ok(Decision::emit(OrderEvent::OrderSubmittedForPayment {
            order_id: self.id,
            total: self.total,
        }))
    }

    /// Moves a pending order to Paid. Nothing is announced for this
    /// transition.
    pub fn mark_as_paid(&mut self) -> Result<Decision<OrderEvent>, OrderError> {
        self.ensure(self.status.can_mark_paid(), "mark as paid")?;
        self.status = OrderStatus::Paid;
        Ok(Decision::silent())
    }

    /// Cancels an open or pending order.
    pub fn cancel(&mut self, reason: impl Into<String>) -> Result<Decision<OrderEvent>, OrderError> {
        self.ensure(self.status.can_cancel(), "cancel")?;
        self.status = OrderStatus::Cancelled;

        Ok(Decision::emit(OrderEvent::OrderCancelled {
            order_id: self.id,
            reason: reason.into(),
        }))
    }

    fn ensure(&self, allowed: bool, action: &'static str) -> Result<(), OrderError> {
        if allowed {
            Ok(())
        } else {
            Err(OrderError::OrderCannotBeModified {
                status: self.status,
                action,
            })
        }
    }
}

/// Sum of the item prices, or `None` when it does not fit in `Money`.
fn total_of<'a>(items: impl IntoIterator<Item = &'a OrderItem>) -> Option<Money> {
    Money::checked_sum(items.into_iter().map(|item| item.price))
}

impl Versioned for Order {
    fn aggregate_type() -> &'static str {
        "Order"
    }

    fn id(&self) -> AggregateId {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl SoftDelete for Order {
    fn mark_deleted(&mut self, at: DateTime<Utc>) {
        self.deleted_at = Some(at);
    }
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Error = OrderError;

    fn advance(&mut self, at: DateTime<Utc>) {
        self.version = self.version.next();
        self.updated_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_order() -> Order {
        Order::new(AggregateId::new(), AggregateId::new())
    }

    fn add(order: &mut Order, price: i64) -> AggregateId {
        let item_id = AggregateId::new();
        order
            .add_item(item_id, AggregateId::new(), Money::from_minor(price))
            .unwrap();
        item_id
    }

    #[test]
    fn test_new_order_is_open_and_empty() {
        let order = open_order();
        assert_eq!(order.status(), OrderStatus::Open);
        assert_eq!(order.version(), Version::first());
        assert_eq!(order.total(), Money::zero());
        assert!(!order.has_items());
    }

    #[test]
    fn test_total_tracks_items() {
        let mut order = open_order();
        let first = add(&mut order, 1000);
        add(&mut order, 250);
        let third = add(&mut order, 0);
        assert_eq!(order.total(), Money::from_minor(1250));

        order.remove_item(first).unwrap();
        assert_eq!(order.total(), Money::from_minor(250));

        order.remove_item(third).unwrap();
        assert_eq!(order.total(), Money::from_minor(250));
        assert_eq!(order.item_count(), 1);
    }

    #[test]
    fn test_items_keep_insertion_order() {
        let mut order = open_order();
        let a = add(&mut order, 1);
        let b = add(&mut order, 2);
        let ids: Vec<_> = order.items().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn test_negative_price_rejected() {
        let mut order = open_order();
        let result = order.add_item(AggregateId::new(), AggregateId::new(), Money::from_minor(-1));
        assert!(matches!(result, Err(OrderError::InvalidPrice { .. })));
        assert!(!order.has_items());
    }

    #[test]
    fn test_total_overflow_rejected_untouched() {
        let mut order = open_order();
        add(&mut order, i64::MAX);
        let before = order.clone();

        let result = order.add_item(AggregateId::new(), AggregateId::new(), Money::from_minor(1));

        assert!(matches!(
            result,
            Err(OrderError::InvalidPrice { price }) if price == Money::from_minor(1)
        ));
        assert_eq!(order, before);
        assert_eq!(order.total(), Money::from_minor(i64::MAX));
    }

    #[test]
    fn test_remove_unknown_item() {
        let mut order = open_order();
        add(&mut order, 10);
        let result = order.remove_item(AggregateId::new());
        assert!(matches!(result, Err(OrderError::ItemNotFound { .. })));
        assert_eq!(order.item_count(), 1);
    }

    #[test]
    fn test_submit_empty_order() {
        let mut order = open_order();
        assert!(matches!(order.submit_for_payment(), Err(OrderError::OrderEmpty)));
        assert_eq!(order.status(), OrderStatus::Open);
    }

    #[test]
    fn test_submit_emits_total() {
        let mut order = open_order();
        add(&mut order, 700);

        let decision = order.submit_for_payment().unwrap();

        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(
            decision.events(),
            &[OrderEvent::OrderSubmittedForPayment {
                order_id: order.id(),
                total: Money::from_minor(700),
            }]
        );
    }

    #[test]
    fn test_mark_as_paid_is_silent() {
        let mut order = open_order();
        add(&mut order, 700);
        order.submit_for_payment().unwrap();

        let decision = order.mark_as_paid().unwrap();

        assert!(!decision.is_unchanged());
        assert!(decision.events().is_empty());
        assert_eq!(order.status(), OrderStatus::Paid);
    }

    #[test]
    fn test_mark_as_paid_requires_pending() {
        let mut order = open_order();
        assert!(matches!(
            order.mark_as_paid(),
            Err(OrderError::OrderCannotBeModified {
                status: OrderStatus::Open,
                ..
            })
        ));
    }

    #[test]
    fn test_terminal_orders_reject_everything() {
        let mut order = open_order();
        add(&mut order, 700);
        order.submit_for_payment().unwrap();
        order.mark_as_paid().unwrap();
        let before = order.clone();

        assert!(order.submit_for_payment().is_err());
        assert!(order.cancel("late").is_err());
        assert!(order.add_item(AggregateId::new(), AggregateId::new(), Money::zero()).is_err());
        assert!(order.remove_item(before.items()[0].id).is_err());
        assert_eq!(order, before);
    }

    #[test]
    fn test_cancel_from_pending() {
        let mut order = open_order();
        add(&mut order, 5);
        order.submit_for_payment().unwrap();

        let decision = order.cancel("changed mind").unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert_eq!(decision.events().len(), 1);
    }

    #[test]
    fn test_soft_delete_keeps_version() {
        let mut order = open_order();
        order.mark_deleted(Utc::now());
        assert!(order.is_deleted());
        assert_eq!(order.version(), Version::first());
    }
}
