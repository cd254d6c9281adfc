//! Product service.

use std::sync::Arc;

use aggregate_store::AggregateStore;
use common::AggregateId;

use crate::Money;
use crate::command::CommandHandler;
use crate::dispatch::EventDispatcher;
use crate::error::DomainError;

use super::{Product, ProductError, ProductEvent};

/// Service for managing the product catalogue.
pub struct ProductService<S> {
    handler: CommandHandler<S, Product>,
}

impl<S: AggregateStore<Product>> ProductService<S> {
    pub fn new(store: S, dispatcher: Arc<dyn EventDispatcher>) -> Self {
        Self {
            handler: CommandHandler::new(store, dispatcher),
        }
    }

    /// Adds a product to the catalogue.
    #[tracing::instrument(skip(self, description))]
    pub async fn create_product(
        &self,
        name: &str,
        description: &str,
        price: Money,
        initial_stock: i64,
    ) -> Result<Product, DomainError> {
        if price.is_negative() {
            return Err(ProductError::InvalidPrice { price }.into());
        }
        if initial_stock < 0 {
            return Err(ProductError::InvalidStockQuantity {
                quantity: initial_stock,
            }
            .into());
        }

        let id = self.handler.next_id();
        let product = Product::new(id, name, description, price, initial_stock)?;
        let created = ProductEvent::ProductCreated {
            product_id: id,
            name: name.to_string(),
        };

        let result = self.handler.create(product, vec![created]).await?;
        Ok(result.aggregate)
    }

    #[tracing::instrument(skip(self))]
    pub async fn change_price(
        &self,
        product_id: AggregateId,
        new_price: Money,
    ) -> Result<Product, DomainError> {
        let result = self
            .handler
            .execute(product_id, |product| product.change_price(new_price))
            .await?;
        Ok(result.aggregate)
    }

    /// Adds `quantity` units to stock.
    #[tracing::instrument(skip(self))]
    pub async fn receive_stock(
        &self,
        product_id: AggregateId,
        quantity: i64,
    ) -> Result<Product, DomainError> {
        ensure_positive(quantity)?;
        self.change_stock(product_id, quantity).await
    }

    /// Takes `quantity` units out of stock.
    #[tracing::instrument(skip(self))]
    pub async fn reserve_stock(
        &self,
        product_id: AggregateId,
        quantity: i64,
    ) -> Result<Product, DomainError> {
        ensure_positive(quantity)?;
        self.change_stock(product_id, -quantity).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn archive_product(&self, product_id: AggregateId) -> Result<Product, DomainError> {
        let result = self
            .handler
            .execute(product_id, |product| product.archive())
            .await?;
        Ok(result.aggregate)
    }

    pub async fn get_product(&self, product_id: AggregateId) -> Result<Product, DomainError> {
        self.handler.load(product_id).await
    }

    async fn change_stock(&self, product_id: AggregateId, delta: i64) -> Result<Product, DomainError> {
        let result = self
            .handler
            .execute(product_id, |product| product.change_stock(delta))
            .await?;
        Ok(result.aggregate)
    }
}

fn ensure_positive(quantity: i64) -> Result<(), ProductError> {
    if quantity <= 0 {
        return Err(ProductError::InvalidStockQuantity { quantity });
    }
    Ok(())
}
