use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use sqlx::{PgConnection, PgPool};

use crate::{
    AggregateId, IdGenerator, LedgerEntry, Result, SoftDelete, StoreError, UuidIdGenerator,
    Version, Versioned,
    store::{AggregateStore, SoftDeleteStore, TransactionLedger, ensure_next_version},
};

/// Creates the `aggregates` and `ledger_entries` tables if they are missing.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::raw_sql(include_str!(
        "../../../migrations/001_create_aggregates_table.sql"
    ))
    .execute(pool)
    .await?;
    Ok(())
}

/// PostgreSQL-backed aggregate store.
///
/// Aggregates are kept as JSONB documents next to a `version` column. Updates
/// are a single conditional `UPDATE ... WHERE version = $expected`, so the
/// database row lock provides the compare-and-swap.
pub struct PostgresAggregateStore<A> {
    pool: PgPool,
    ids: Arc<dyn IdGenerator>,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A> Clone for PostgresAggregateStore<A> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            ids: Arc::clone(&self.ids),
            _aggregate: PhantomData,
        }
    }
}

impl<A> PostgresAggregateStore<A>
where
    A: Versioned + Serialize + DeserializeOwned,
{
    /// Creates a store handing out random UUIDs.
    pub fn new(pool: PgPool) -> Self {
        Self::with_id_generator(pool, Arc::new(UuidIdGenerator))
    }

    /// Creates a store using the given identifier generator.
    pub fn with_id_generator(pool: PgPool, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            pool,
            ids,
            _aggregate: PhantomData,
        }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn unique_keys_json(aggregate: &A) -> serde_json::Value {
        let keys: serde_json::Map<String, serde_json::Value> = aggregate
            .unique_keys()
            .into_iter()
            .map(|k| (k.name.to_string(), serde_json::Value::String(k.value)))
            .collect();
        serde_json::Value::Object(keys)
    }

    async fn lock_key(conn: &mut PgConnection, key: &str) -> Result<()> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(key)
            .execute(conn)
            .await?;
        Ok(())
    }

    async fn stored_version(conn: &mut PgConnection, id: AggregateId) -> Result<Option<Version>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM aggregates WHERE id = $1 AND aggregate_type = $2")
                .bind(id.as_uuid())
                .bind(A::aggregate_type())
                .fetch_optional(conn)
                .await?;
        Ok(version.map(Version::new))
    }

    /// Conditional update on an open connection, shared by `update` and the
    /// ledger's `commit`.
    async fn update_on(conn: &mut PgConnection, aggregate: &A) -> Result<()> {
        let id = aggregate.id();
        let expected = aggregate.version().previous();
        let state = serde_json::to_value(aggregate)?;

        let result = sqlx::query(
            r#"
            UPDATE aggregates
            SET state = $1, version = $2, unique_keys = $3, updated_at = $4
            WHERE id = $5 AND aggregate_type = $6 AND version = $7
            "#,
        )
        .bind(state)
        .bind(aggregate.version().as_i64())
        .bind(Self::unique_keys_json(aggregate))
        .bind(Utc::now())
        .bind(id.as_uuid())
        .bind(A::aggregate_type())
        .bind(expected.as_i64())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        match Self::stored_version(conn, id).await? {
            Some(actual) => {
                ensure_next_version(A::aggregate_type(), id, actual, aggregate.version())?;
                // The row moved between the update and this read.
                Err(StoreError::OptimisticLockConflict {
                    aggregate_type: A::aggregate_type(),
                    id,
                    expected,
                    actual,
                })
            }
            None => Err(StoreError::NotFound {
                aggregate_type: A::aggregate_type(),
                id,
            }),
        }
    }
}

#[async_trait]
impl<A> AggregateStore<A> for PostgresAggregateStore<A>
where
    A: Versioned + Serialize + DeserializeOwned,
{
    fn next_id(&self) -> AggregateId {
        self.ids.next_id()
    }

    async fn create(&self, aggregate: A) -> Result<()> {
        let id = aggregate.id();
        let mut tx = self.pool.begin().await?;

        // Same precedence as the in-memory store: an existing id wins over
        // a bad starting version.
        let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM aggregates WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_some() {
            return Err(StoreError::AlreadyExists {
                aggregate_type: A::aggregate_type(),
                id,
            });
        }

        ensure_next_version(
            A::aggregate_type(),
            id,
            Version::initial(),
            aggregate.version(),
        )?;

        for key in aggregate.unique_keys() {
            let lock = format!("{}:{}:{}", A::aggregate_type(), key.name, key.value);
            Self::lock_key(&mut *tx, &lock).await?;

            let taken: Option<i32> = sqlx::query_scalar(
                r#"
                SELECT 1 FROM aggregates
                WHERE aggregate_type = $1 AND deleted_at IS NULL AND unique_keys ->> $2 = $3
                LIMIT 1
                "#,
            )
            .bind(A::aggregate_type())
            .bind(key.name)
            .bind(&key.value)
            .fetch_optional(&mut *tx)
            .await?;

            if taken.is_some() {
                return Err(StoreError::DuplicateKey {
                    aggregate_type: A::aggregate_type(),
                    key: key.name,
                    value: key.value,
                });
            }
        }

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO aggregates (id, aggregate_type, version, state, unique_keys, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id.as_uuid())
        .bind(A::aggregate_type())
        .bind(aggregate.version().as_i64())
        .bind(serde_json::to_value(&aggregate)?)
        .bind(Self::unique_keys_json(&aggregate))
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists {
                aggregate_type: A::aggregate_type(),
                id,
            });
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find(&self, id: AggregateId) -> Result<A> {
        let state: Option<serde_json::Value> = sqlx::query_scalar(
            r#"
            SELECT state FROM aggregates
            WHERE id = $1 AND aggregate_type = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(id.as_uuid())
        .bind(A::aggregate_type())
        .fetch_optional(&self.pool)
        .await?;

        match state {
            Some(state) => Ok(serde_json::from_value(state)?),
            None => Err(StoreError::NotFound {
                aggregate_type: A::aggregate_type(),
                id,
            }),
        }
    }

    async fn find_by_key(&self, key: &'static str, value: &str) -> Result<Option<A>> {
        let state: Option<serde_json::Value> = sqlx::query_scalar(
            r#"
            SELECT state FROM aggregates
            WHERE aggregate_type = $1 AND deleted_at IS NULL AND unique_keys ->> $2 = $3
            LIMIT 1
            "#,
        )
        .bind(A::aggregate_type())
        .bind(key)
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;

        state
            .map(serde_json::from_value)
            .transpose()
            .map_err(StoreError::from)
    }

    async fn update(&self, aggregate: A) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        Self::update_on(&mut conn, &aggregate).await
    }
}

#[async_trait]
impl<A> SoftDeleteStore<A> for PostgresAggregateStore<A>
where
    A: SoftDelete + Serialize + DeserializeOwned,
{
    async fn delete(&self, id: AggregateId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let state: Option<serde_json::Value> = sqlx::query_scalar(
            r#"
            SELECT state FROM aggregates
            WHERE id = $1 AND aggregate_type = $2 AND deleted_at IS NULL
            FOR UPDATE
            "#,
        )
        .bind(id.as_uuid())
        .bind(A::aggregate_type())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(state) = state else {
            return Err(StoreError::NotFound {
                aggregate_type: A::aggregate_type(),
                id,
            });
        };

        let mut aggregate: A = serde_json::from_value(state)?;
        let now = Utc::now();
        aggregate.mark_deleted(now);

        sqlx::query("UPDATE aggregates SET state = $1, deleted_at = $2 WHERE id = $3")
            .bind(serde_json::to_value(&aggregate)?)
            .bind(now)
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

/// PostgreSQL-backed transaction ledger.
///
/// Duplicate-reference detection is serialized with a transaction-scoped
/// advisory lock on (owner, reference); `commit` inserts the entry and runs
/// the owner's conditional update inside the same database transaction.
pub struct PostgresLedger<A, E> {
    pool: PgPool,
    _types: PhantomData<fn() -> (A, E)>,
}

impl<A, E> Clone for PostgresLedger<A, E> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _types: PhantomData,
        }
    }
}

impl<A, E> PostgresLedger<A, E>
where
    A: Versioned + Serialize + DeserializeOwned,
    E: LedgerEntry + Serialize + DeserializeOwned,
{
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _types: PhantomData,
        }
    }

    async fn insert_on(conn: &mut PgConnection, entry: &E) -> Result<()> {
        let lock = format!("ledger:{}:{}", entry.owner_id(), entry.reference());
        PostgresAggregateStore::<A>::lock_key(&mut *conn, &lock).await?;

        if entry.is_settled() {
            let settled: Option<i32> = sqlx::query_scalar(
                r#"
                SELECT 1 FROM ledger_entries
                WHERE owner_id = $1 AND reference = $2 AND settled
                LIMIT 1
                "#,
            )
            .bind(entry.owner_id().as_uuid())
            .bind(entry.reference())
            .fetch_optional(&mut *conn)
            .await?;

            if settled.is_some() {
                return Err(StoreError::DuplicateKey {
                    aggregate_type: A::aggregate_type(),
                    key: "reference",
                    value: entry.reference().to_string(),
                });
            }
        }

        sqlx::query(
            r#"
            INSERT INTO ledger_entries (id, owner_id, reference, settled, entry, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.id().as_uuid())
        .bind(entry.owner_id().as_uuid())
        .bind(entry.reference())
        .bind(entry.is_settled())
        .bind(serde_json::to_value(entry)?)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl<A, E> TransactionLedger<A, E> for PostgresLedger<A, E>
where
    A: Versioned + Serialize + DeserializeOwned,
    E: LedgerEntry + Serialize + DeserializeOwned,
{
    async fn find_by_reference(
        &self,
        owner_id: AggregateId,
        reference: &str,
    ) -> Result<Option<E>> {
        let entry: Option<serde_json::Value> = sqlx::query_scalar(
            r#"
            SELECT entry FROM ledger_entries
            WHERE owner_id = $1 AND reference = $2
            ORDER BY recorded_at ASC
            LIMIT 1
            "#,
        )
        .bind(owner_id.as_uuid())
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;

        entry
            .map(serde_json::from_value)
            .transpose()
            .map_err(StoreError::from)
    }

    async fn append(&self, entry: E) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::insert_on(&mut *tx, &entry).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn commit(&self, entry: E, aggregate: A) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::insert_on(&mut *tx, &entry).await?;
        PostgresAggregateStore::<A>::update_on(&mut *tx, &aggregate).await?;
        tx.commit().await?;
        Ok(())
    }
}
