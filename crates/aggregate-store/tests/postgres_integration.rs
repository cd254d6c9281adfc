//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p aggregate-store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use aggregate_store::{
    AggregateId, AggregateStore, LedgerEntry, PostgresAggregateStore, PostgresLedger,
    SoftDelete, SoftDeleteStore, StoreError, TransactionLedger, UniqueKey, Version, Versioned,
    run_migrations,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            run_migrations(&temp_pool).await.unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh pool with cleared tables
async fn get_test_pool() -> PgPool {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE ledger_entries, aggregates")
        .execute(&pool)
        .await
        .unwrap();

    pool
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Account {
    id: AggregateId,
    version: Version,
    owner: String,
    balance: i64,
    deleted_at: Option<DateTime<Utc>>,
}

impl Account {
    fn open(id: AggregateId, owner: &str) -> Self {
        Self {
            id,
            version: Version::first(),
            owner: owner.to_string(),
            balance: 0,
            deleted_at: None,
        }
    }

    fn credited(&self, amount: i64) -> Self {
        let mut next = self.clone();
        next.balance += amount;
        next.version = next.version.next();
        next
    }
}

impl Versioned for Account {
    fn aggregate_type() -> &'static str {
        "Account"
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

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::new("owner", self.owner.clone())]
    }
}

impl SoftDelete for Account {
    fn mark_deleted(&mut self, at: DateTime<Utc>) {
        self.deleted_at = Some(at);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Posting {
    id: AggregateId,
    account_id: AggregateId,
    reference: String,
    settled: bool,
}

impl Posting {
    fn settled(account_id: AggregateId, reference: &str) -> Self {
        Self {
            id: AggregateId::new(),
            account_id,
            reference: reference.to_string(),
            settled: true,
        }
    }
}

impl LedgerEntry for Posting {
    fn id(&self) -> AggregateId {
        self.id
    }

    fn owner_id(&self) -> AggregateId {
        self.account_id
    }

    fn reference(&self) -> &str {
        &self.reference
    }

    fn is_settled(&self) -> bool {
        self.settled
    }
}

async fn open_account(store: &PostgresAggregateStore<Account>, owner: &str) -> Account {
    let account = Account::open(store.next_id(), owner);
    store.create(account.clone()).await.unwrap();
    account
}

#[tokio::test]
async fn create_and_find() {
    let store = PostgresAggregateStore::<Account>::new(get_test_pool().await);
    let account = open_account(&store, "alice").await;

    let loaded = store.find(account.id).await.unwrap();
    assert_eq!(loaded, account);
}

#[tokio::test]
async fn find_missing_is_not_found() {
    let store = PostgresAggregateStore::<Account>::new(get_test_pool().await);
    let result = store.find(AggregateId::new()).await;
    assert!(matches!(result, Err(StoreError::NotFound { .. })));
}

#[tokio::test]
async fn create_twice_is_already_exists() {
    let store = PostgresAggregateStore::<Account>::new(get_test_pool().await);
    let account = open_account(&store, "alice").await;

    let mut again = account.clone();
    again.owner = "someone-else".to_string();
    let result = store.create(again).await;
    assert!(matches!(result, Err(StoreError::AlreadyExists { .. })));
}

#[tokio::test]
async fn create_existing_id_at_later_version_is_already_exists() {
    let store = PostgresAggregateStore::<Account>::new(get_test_pool().await);
    let account = open_account(&store, "alice").await;

    let result = store.create(account.credited(5)).await;
    assert!(matches!(result, Err(StoreError::AlreadyExists { .. })));
    assert_eq!(store.find(account.id).await.unwrap(), account);
}

#[tokio::test]
async fn create_rejects_taken_unique_key() {
    let store = PostgresAggregateStore::<Account>::new(get_test_pool().await);
    open_account(&store, "alice").await;

    let result = store.create(Account::open(store.next_id(), "alice")).await;
    assert!(matches!(
        result,
        Err(StoreError::DuplicateKey { key: "owner", .. })
    ));
}

#[tokio::test]
async fn find_by_key_returns_live_aggregate() {
    let store = PostgresAggregateStore::<Account>::new(get_test_pool().await);
    let account = open_account(&store, "alice").await;

    let found = store.find_by_key("owner", "alice").await.unwrap();
    assert_eq!(found.map(|a| a.id), Some(account.id));
    assert!(store.find_by_key("owner", "bob").await.unwrap().is_none());
}

#[tokio::test]
async fn update_requires_next_version() {
    let store = PostgresAggregateStore::<Account>::new(get_test_pool().await);
    let account = open_account(&store, "alice").await;

    store.update(account.credited(10)).await.unwrap();
    let stale = store.update(account.credited(99)).await;

    assert!(matches!(
        stale,
        Err(StoreError::OptimisticLockConflict { expected, actual, .. })
            if expected == Version::first() && actual == Version::new(2)
    ));

    let loaded = store.find(account.id).await.unwrap();
    assert_eq!(loaded.balance, 10);
    assert_eq!(loaded.version, Version::new(2));
}

#[tokio::test]
async fn update_missing_is_not_found() {
    let store = PostgresAggregateStore::<Account>::new(get_test_pool().await);
    let ghost = Account::open(AggregateId::new(), "ghost").credited(1);
    let result = store.update(ghost).await;
    assert!(matches!(result, Err(StoreError::NotFound { .. })));
}

#[tokio::test]
async fn concurrent_updates_have_a_single_winner() {
    let store = PostgresAggregateStore::<Account>::new(get_test_pool().await);
    let account = open_account(&store, "alice").await;

    let attempts = (1..=5).map(|amount| {
        let store = store.clone();
        let next = account.credited(amount);
        tokio::spawn(async move { store.update(next).await })
    });

    let results = futures_util::future::join_all(attempts).await;
    let winners = results
        .into_iter()
        .map(|r| r.unwrap())
        .filter(Result::is_ok)
        .count();

    assert_eq!(winners, 1);
    assert_eq!(
        store.find(account.id).await.unwrap().version,
        Version::new(2)
    );
}

#[tokio::test]
async fn delete_hides_aggregate_and_frees_key() {
    let store = PostgresAggregateStore::<Account>::new(get_test_pool().await);
    let account = open_account(&store, "alice").await;

    store.delete(account.id).await.unwrap();

    assert!(matches!(
        store.find(account.id).await,
        Err(StoreError::NotFound { .. })
    ));
    assert!(store.find_by_key("owner", "alice").await.unwrap().is_none());
    assert!(store.delete(account.id).await.is_err());

    open_account(&store, "alice").await;
}

#[tokio::test]
async fn ledger_commit_applies_entry_and_update_together() {
    let pool = get_test_pool().await;
    let store = PostgresAggregateStore::<Account>::new(pool.clone());
    let ledger = PostgresLedger::<Account, Posting>::new(pool);
    let account = open_account(&store, "alice").await;

    ledger
        .commit(Posting::settled(account.id, "dep-1"), account.credited(50))
        .await
        .unwrap();

    let found = ledger.find_by_reference(account.id, "dep-1").await.unwrap();
    assert!(found.is_some());
    assert_eq!(store.find(account.id).await.unwrap().balance, 50);
}

#[tokio::test]
async fn ledger_rejects_second_settled_reference() {
    let pool = get_test_pool().await;
    let store = PostgresAggregateStore::<Account>::new(pool.clone());
    let ledger = PostgresLedger::<Account, Posting>::new(pool);
    let account = open_account(&store, "alice").await;

    let first = account.credited(50);
    ledger
        .commit(Posting::settled(account.id, "dep-1"), first.clone())
        .await
        .unwrap();

    let result = ledger
        .commit(Posting::settled(account.id, "dep-1"), first.credited(50))
        .await;

    assert!(matches!(
        result,
        Err(StoreError::DuplicateKey {
            key: "reference",
            ..
        })
    ));
    assert_eq!(store.find(account.id).await.unwrap().balance, 50);
}

#[tokio::test]
async fn ledger_commit_rolls_back_entry_on_conflict() {
    let pool = get_test_pool().await;
    let store = PostgresAggregateStore::<Account>::new(pool.clone());
    let ledger = PostgresLedger::<Account, Posting>::new(pool);
    let account = open_account(&store, "alice").await;

    store.update(account.credited(5)).await.unwrap();

    let result = ledger
        .commit(Posting::settled(account.id, "dep-1"), account.credited(50))
        .await;

    assert!(result.is_err_and(|e| e.is_conflict()));
    assert!(
        ledger
            .find_by_reference(account.id, "dep-1")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn ledger_allows_unsettled_entries_before_settled_one() {
    let pool = get_test_pool().await;
    let store = PostgresAggregateStore::<Account>::new(pool.clone());
    let ledger = PostgresLedger::<Account, Posting>::new(pool);
    let account = open_account(&store, "alice").await;

    let mut pending = Posting::settled(account.id, "pay-1");
    pending.settled = false;
    ledger.append(pending.clone()).await.unwrap();

    ledger
        .append(Posting::settled(account.id, "pay-1"))
        .await
        .unwrap();

    let found = ledger
        .find_by_reference(account.id, "pay-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, pending.id);
}
