//! The closed set of events every service can dispatch.

use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::notification::NotificationEvent;
use crate::order::OrderEvent;
use crate::product::ProductEvent;
use crate::user::UserEvent;
use crate::wallet::WalletEvent;

/// Any domain event, tagged by the domain that produced it.
///
/// Dispatchers accept this type directly so sinks can match on the variant
/// instead of inspecting type names at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event")]
pub enum Event {
    Order(OrderEvent),
    Wallet(WalletEvent),
    Product(ProductEvent),
    User(UserEvent),
    Notification(NotificationEvent),
}

impl Event {
    /// Name of the domain that produced the event.
    pub fn domain(&self) -> &'static str {
        match self {
            Event::Order(_) => "Order",
            Event::Wallet(_) => "Wallet",
            Event::Product(_) => "Product",
            Event::User(_) => "User",
            Event::Notification(_) => "Notification",
        }
    }
}

impl DomainEvent for Event {
    fn event_type(&self) -> &'static str {
        match self {
            Event::Order(e) => e.event_type(),
            Event::Wallet(e) => e.event_type(),
            Event::Product(e) => e.event_type(),
            Event::User(e) => e.event_type(),
            Event::Notification(e) => e.event_type(),
        }
    }
}

impl From<OrderEvent> for Event {
    fn from(event: OrderEvent) -> Self {
        Event::Order(event)
    }
}

impl From<WalletEvent> for Event {
    fn from(event: WalletEvent) -> Self {
        Event::Wallet(event)
    }
}

impl From<ProductEvent> for Event {
    fn from(event: ProductEvent) -> Self {
        Event::Product(event)
    }
}

impl From<UserEvent> for Event {
    fn from(event: UserEvent) -> Self {
        Event::User(event)
    }
}

impl From<NotificationEvent> for Event {
    fn from(event: NotificationEvent) -> Self {
        Event::Notification(event)
    }
}
