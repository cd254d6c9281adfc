//! Domain layer for the store services.
//!
//! Each service owns one aggregate type and runs its commands through the
//! same cycle: load the current snapshot, check preconditions, advance the
//! version, write it back with the version precondition, then dispatch the
//! resulting events. Failures are typed and classified by [`ErrorKind`].
//!
//! - [`order`]: order lifecycle with a running total
//! - [`wallet`]: balances with idempotent, reference-keyed money movement
//! - [`product`]: catalogue with price and stock
//! - [`user`]: registration, profile and account status
//! - [`notification`]: recorded outbound messages

pub mod aggregate;
pub mod command;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod money;
pub mod notification;
pub mod order;
pub mod product;
pub mod retry;
pub mod user;
pub mod wallet;

pub use aggregate::{Aggregate, Decision, DomainEvent};
pub use command::{CommandHandler, CommandResult};
pub use dispatch::{
    BroadcastDispatcher, DispatchError, EventDispatcher, FanOutDispatcher, RecordingDispatcher,
    TracingDispatcher,
};
pub use error::{DomainError, ErrorKind};
pub use event::Event;
pub use money::Money;
pub use notification::{
    Notification, NotificationChannel, NotificationError, NotificationEvent, NotificationSender,
    NotificationService, NotificationStatus,
};
pub use order::{Order, OrderError, OrderEvent, OrderItem, OrderService, OrderStatus};
pub use product::{Product, ProductError, ProductEvent, ProductService, ProductStatus};
pub use retry::retry_on_conflict;
pub use user::{CredentialHasher, HashError, User, UserError, UserEvent, UserService, UserStatus};
pub use wallet::{Transaction, Wallet, WalletError, WalletEvent, WalletService};
