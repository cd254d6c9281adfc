//! Product aggregate implementation.

use aggregate_store::{Version, Versioned};
use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::Money;
use crate::aggregate::{Aggregate, Decision};

use super::{ProductError, ProductEvent};

/// Lifecycle of a catalogue product.
///
/// ```text
/// Available ◄──► Unavailable
///     │
///     └──► Archived (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProductStatus {
    #[default]
    Available,
    Unavailable,
    Archived,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Available => "Available",
            ProductStatus::Unavailable => "Unavailable",
            ProductStatus::Archived => "Archived",
        }
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Product aggregate root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    id: AggregateId,
    version: Version,
    name: String,
    description: String,
    price: Money,
    stock: i64,
    status: ProductStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Product {
    /// Creates an available product at version 1.
    pub fn new(
        id: AggregateId,
        name: impl Into<String>,
        description: impl Into<String>,
        price: Money,
        stock: i64,
    ) -> Result<Self, ProductError> {
        if price.is_negative() {
            return Err(ProductError::InvalidPrice { price });
        }
        if stock < 0 {
            return Err(ProductError::InvalidStockQuantity { quantity: stock });
        }

        let now = Utc::now();
        Ok(Self {
            id,
            version: Version::first(),
            name: name.into(),
            description: description.into(),
            price,
            stock,
            status: ProductStatus::Available,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn stock(&self) -> i64 {
        self.stock
    }

    pub fn status(&self) -> ProductStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

// Command methods
impl Product {
    pub fn change_price(&mut self, new_price: Money) -> Result<Decision<ProductEvent>, ProductError> {
        if self.status == ProductStatus::Archived {
            return Err(ProductError::ProductNotAvailable {
                status: self.status,
                action: "change price",
            });
        }
        if new_price.is_negative() {
            return Err(ProductError::InvalidPrice { price: new_price });
        }

        let old_price = self.price;
        self.price = new_price;

        Ok(Decision::emit(ProductEvent::ProductPriceChanged {
            product_id: self.id,
            old_price,
            new_price,
        }))
    }

    /// Moves stock by a signed delta. Only available products can move stock,
    /// and the result must be a non-negative `i64`.
    pub fn change_stock(&mut self, delta: i64) -> Result<Decision<ProductEvent>, ProductError> {
        if self.status != ProductStatus::Available {
            return Err(ProductError::ProductNotAvailable {
                status: self.status,
                action: "change stock",
            });
        }

        let new_quantity = self
            .stock
            .checked_add(delta)
            .ok_or(ProductError::InvalidStockQuantity { quantity: delta })?;
        if new_quantity < 0 {
            return Err(ProductError::InsufficientStock {
                available: self.stock,
                requested: -delta,
            });
        }

        self.stock = new_quantity;

        Ok(Decision::emit(ProductEvent::ProductStockChanged {
            product_id: self.id,
            delta,
            new_quantity,
        }))
    }

    /// Archives the product. Archiving twice is a no-op.
    pub fn archive(&mut self) -> Result<Decision<ProductEvent>, ProductError> {
        if self.status == ProductStatus::Archived {
            return Ok(Decision::Unchanged);
        }

        self.status = ProductStatus::Archived;

        Ok(Decision::emit(ProductEvent::ProductArchived {
            product_id: self.id,
        }))
    }
}

impl Versioned for Product {
    fn aggregate_type() -> &'static str {
        "Product"
    }

    fn id(&self) -> AggregateId {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }
}

impl Aggregate for Product {
    type Event = ProductEvent;
    type Error = ProductError;

    fn advance(&mut self, at: DateTime<Utc>) {
        self.version = self.version.next();
        self.updated_at = at;
    }
}
