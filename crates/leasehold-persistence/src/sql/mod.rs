//! SQL-based lock store (MySQL/PostgreSQL/SQLite via SeaORM)
//!
//! Mutual exclusion comes from the primary key on `locks.lock_key`: the
//! database rejects a second insert for the same key, and that rejection is
//! classified as `StoreError::Conflict`.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{prelude::Expr, *};
use tracing::debug;

use crate::entity::lock;
use crate::model::{LockRecord, NewLock, StorageMode};
use crate::traits::{LockStore, StoreError};

/// External database lock store
///
/// Wraps a SeaORM `DatabaseConnection`; all coordination happens through the
/// database's uniqueness guarantee.
pub struct SqlLockStore {
    db: DatabaseConnection,
}

impl SqlLockStore {
    /// Create a new SqlLockStore with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Get a reference to the underlying database connection
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// Split insert failures into key conflicts and everything else.
fn classify_insert_error(key: &str, err: DbErr) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            debug!(key = %key, detail = %detail, "Unique constraint rejected lock insert");
            StoreError::Conflict(key.to_string())
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl LockStore for SqlLockStore {
    async fn insert(&self, lock: &NewLock) -> Result<(), StoreError> {
        let now = Utc::now().naive_utc();
        let model = lock::ActiveModel {
            lock_key: Set(lock.key.clone()),
            owner: Set(lock.owner.clone()),
            expires_at: Set(Some(lock.expires_at.naive_utc())),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
        };

        lock::Entity::insert(model)
            .exec_without_returning(&self.db)
            .await
            .map_err(|e| classify_insert_error(&lock.key, e))?;

        Ok(())
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<LockRecord>, StoreError> {
        let result = lock::Entity::find()
            .filter(lock::Column::LockKey.eq(key))
            .one(&self.db)
            .await?;

        Ok(result.map(LockRecord::from))
    }

    async fn delete(&self, record: &LockRecord) -> Result<bool, StoreError> {
        let query = lock::Entity::delete_many()
            .filter(lock::Column::LockKey.eq(record.key.as_str()))
            .filter(lock::Column::Owner.eq(record.owner.as_str()));

        let query = match record.expires_at_utc() {
            Some(deadline) => query.filter(lock::Column::ExpiresAt.eq(deadline.naive_utc())),
            None => query.filter(lock::Column::ExpiresAt.is_null()),
        };

        let result = query.exec(&self.db).await?;

        Ok(result.rows_affected > 0)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        // Touches the locks table, so a missing migration also fails here
        lock::Entity::find()
            .select_only()
            .column_as(Expr::cust("1"), "health")
            .into_tuple::<i32>()
            .one(&self.db)
            .await?;
        Ok(())
    }

    fn storage_mode(&self) -> StorageMode {
        StorageMode::ExternalDb
    }
}
