//! Order service providing the public API for order operations.

use std::sync::Arc;

use aggregate_store::SoftDeleteStore;
use common::AggregateId;

use crate::Money;
use crate::command::CommandHandler;
use crate::dispatch::EventDispatcher;
use crate::error::DomainError;

use super::{Order, OrderError, OrderEvent};

/// Service for managing orders.
///
/// Wraps a command handler over a soft-deletable order store. Every mutating
/// method either persists exactly one new version and dispatches its events,
/// or returns an error having written and dispatched nothing.
pub struct OrderService<S> {
    handler: CommandHandler<S, Order>,
}

impl<S: SoftDeleteStore<Order>> OrderService<S> {
    /// Creates a new order service with the given store and dispatcher.
    pub fn new(store: S, dispatcher: Arc<dyn EventDispatcher>) -> Self {
        Self {
            handler: CommandHandler::new(store, dispatcher),
        }
    }

    /// Opens a new, empty order for a customer.
    #[tracing::instrument(skip(self))]
    pub async fn create_order(&self, customer_id: AggregateId) -> Result<Order, DomainError> {
        let order_id = self.handler.next_id();
        let created = OrderEvent::OrderCreated {
            order_id,
            customer_id,
        };

        let result = self
            .handler
            .create(Order::new(order_id, customer_id), vec![created])
            .await?;
        Ok(result.aggregate)
    }

    /// Adds an item to an open order and returns the new item's identifier.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        order_id: AggregateId,
        product_id: AggregateId,
        price: Money,
    ) -> Result<AggregateId, DomainError> {
        if price.is_negative() {
            return Err(OrderError::InvalidPrice { price }.into());
        }

        let item_id = self.handler.next_id();
        self.handler
            .execute(order_id, |order| order.add_item(item_id, product_id, price))
            .await?;
        Ok(item_id)
    }

    /// Removes an item from an open order.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(
        &self,
        order_id: AggregateId,
        item_id: AggregateId,
    ) -> Result<Order, DomainError> {
        let result = self
            .handler
            .execute(order_id, |order| order.remove_item(item_id))
            .await?;
        Ok(result.aggregate)
    }

    /// Submits an open order for payment.
    #[tracing::instrument(skip(self))]
    pub async fn submit_for_payment(&self, order_id: AggregateId) -> Result<Order, DomainError> {
        let result = self
            .handler
            .execute(order_id, |order| order.submit_for_payment())
            .await?;
        Ok(result.aggregate)
    }

    /// Marks a pending order as paid.
    #[tracing::instrument(skip(self))]
    pub async fn mark_as_paid(&self, order_id: AggregateId) -> Result<Order, DomainError> {
        let result = self
            .handler
            .execute(order_id, |order| order.mark_as_paid())
            .await?;
        Ok(result.aggregate)
    }

    /// Cancels an open or pending order.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        order_id: AggregateId,
        reason: &str,
    ) -> Result<Order, DomainError> {
        let result = self
            .handler
            .execute(order_id, |order| order.cancel(reason))
            .await?;
        Ok(result.aggregate)
    }

    /// Loads an order by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: AggregateId) -> Result<Order, DomainError> {
        self.handler.load(order_id).await
    }

    /// Soft-deletes an order. Deleted orders are no longer found.
    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, order_id: AggregateId) -> Result<(), DomainError> {
        self.handler.store().delete(order_id).await?;
        Ok(())
    }
}
