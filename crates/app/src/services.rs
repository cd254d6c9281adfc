//! Backend selection and service wiring.

use std::sync::Arc;

use aggregate_store::{
    AggregateStore, InMemoryAggregateStore, InMemoryLedger, PostgresAggregateStore,
    PostgresLedger, SoftDeleteStore, TransactionLedger, run_migrations,
};
use domain::notification::NotificationSender;
use domain::user::CredentialHasher;
use domain::{
    EventDispatcher, Notification, NotificationService, Order, OrderService, Product,
    ProductService, Transaction, User, UserService, Wallet, WalletService,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::Config;
use crate::error::AppError;

pub type OrderStore = Arc<dyn SoftDeleteStore<Order>>;
pub type WalletStore = Arc<dyn AggregateStore<Wallet>>;
pub type WalletLedger = Arc<dyn TransactionLedger<Wallet, Transaction>>;
pub type ProductStore = Arc<dyn AggregateStore<Product>>;
pub type UserStore = Arc<dyn AggregateStore<User>>;
pub type NotificationStore = Arc<dyn AggregateStore<Notification>>;

/// One store per aggregate type, all on the same backend.
#[derive(Clone)]
pub struct Backend {
    pub orders: OrderStore,
    pub wallets: WalletStore,
    pub ledger: WalletLedger,
    pub products: ProductStore,
    pub users: UserStore,
    pub notifications: NotificationStore,
}

impl Backend {
    pub fn in_memory() -> Self {
        let wallets = InMemoryAggregateStore::<Wallet>::new();
        let ledger = InMemoryLedger::<Wallet, Transaction>::new(wallets.clone());

        Self {
            orders: Arc::new(InMemoryAggregateStore::<Order>::new()),
            wallets: Arc::new(wallets),
            ledger: Arc::new(ledger),
            products: Arc::new(InMemoryAggregateStore::<Product>::new()),
            users: Arc::new(InMemoryAggregateStore::<User>::new()),
            notifications: Arc::new(InMemoryAggregateStore::<Notification>::new()),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            orders: Arc::new(PostgresAggregateStore::<Order>::new(pool.clone())),
            wallets: Arc::new(PostgresAggregateStore::<Wallet>::new(pool.clone())),
            ledger: Arc::new(PostgresLedger::<Wallet, Transaction>::new(pool.clone())),
            products: Arc::new(PostgresAggregateStore::<Product>::new(pool.clone())),
            users: Arc::new(PostgresAggregateStore::<User>::new(pool.clone())),
            notifications: Arc::new(PostgresAggregateStore::<Notification>::new(pool)),
        }
    }

    /// Connects to PostgreSQL and applies the schema when `DATABASE_URL` is
    /// set, otherwise falls back to the in-memory backend.
    pub async fn connect(config: &Config) -> Result<Self, AppError> {
        let Some(url) = config.database_url.as_deref() else {
            tracing::info!("no DATABASE_URL set, using in-memory backend");
            return Ok(Self::in_memory());
        };

        let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
        run_migrations(&pool).await?;
        tracing::info!("connected to PostgreSQL backend");
        Ok(Self::postgres(pool))
    }
}

/// Every domain service, sharing one dispatcher.
pub struct Services {
    pub orders: OrderService<OrderStore>,
    pub wallets: WalletService<WalletStore, WalletLedger>,
    pub products: ProductService<ProductStore>,
    pub users: UserService<UserStore>,
    pub notifications: Arc<NotificationService<NotificationStore>>,
}

impl Services {
    pub fn new(
        backend: Backend,
        config: &Config,
        hasher: Arc<dyn CredentialHasher>,
        dispatcher: Arc<dyn EventDispatcher>,
        senders: Vec<Arc<dyn NotificationSender>>,
    ) -> Self {
        let notifications = senders.into_iter().fold(
            NotificationService::new(backend.notifications, Arc::clone(&dispatcher)),
            |service, sender| service.with_sender(sender),
        );

        Self {
            orders: OrderService::new(backend.orders, Arc::clone(&dispatcher)),
            wallets: WalletService::new(backend.wallets, backend.ledger, Arc::clone(&dispatcher))
                .with_currency(config.wallet_currency.as_str()),
            products: ProductService::new(backend.products, Arc::clone(&dispatcher)),
            users: UserService::new(backend.users, hasher, Arc::clone(&dispatcher))
                .with_min_password_length(config.min_password_length),
            notifications: Arc::new(notifications),
        }
    }
}
