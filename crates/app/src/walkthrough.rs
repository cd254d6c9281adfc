//! A short scripted session that drives every service once.

use aggregate_store::Versioned;
use common::AggregateId;
use domain::{DomainError, Money};

use crate::services::Services;

/// What the walkthrough produced, for logging and assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub user_id: AggregateId,
    pub order_id: AggregateId,
    pub order_total: Money,
    pub balance: Money,
    pub stock_left: i64,
}

/// Registers a customer under a fresh email, funds their wallet, reserves stock for an order
/// and pays for it. The deposit is sent twice to show reference-keyed
/// idempotency.
pub async fn run(services: &Services) -> Result<Summary, DomainError> {
    let email = format!("customer-{}@example.com", AggregateId::new());
    let user = services
        .users
        .register_new_user("Ada", "Lovelace", &email, "analytical-engine")
        .await?;
    let user_id = user.id();

    services.wallets.create_wallet(user_id).await?;
    for _ in 0..2 {
        services
            .wallets
            .deposit(user_id, Money::from_minor(200_000), "welcome-credit")
            .await?;
    }

    let laptop = services
        .products
        .create_product("Laptop", "14 inch, 16 GB", Money::from_minor(150_000), 10)
        .await?;
    let laptop_id = laptop.id();
    let reserved = services.products.reserve_stock(laptop_id, 1).await?;

    let order = services.orders.create_order(user_id).await?;
    let order_id = order.id();
    services
        .orders
        .add_item(order_id, laptop_id, laptop.price())
        .await?;
    let pending = services.orders.submit_for_payment(order_id).await?;

    let wallet = services
        .wallets
        .pay_for_order(user_id, order_id, pending.total())
        .await?;
    services.orders.mark_as_paid(order_id).await?;
    services
        .notifications
        .notify_order_confirmation(user_id, user.email(), order_id)
        .await?;

    let summary = Summary {
        user_id,
        order_id,
        order_total: pending.total(),
        balance: wallet.balance(),
        stock_left: reserved.stock(),
    };
    tracing::info!(?summary, "walkthrough finished");
    Ok(summary)
}

