//! Storage contract for lock records
//!
//! The lock manager holds no state of its own; every guarantee it gives rests
//! on a `LockStore` enforcing one record per key atomically.

use async_trait::async_trait;
use sea_orm::DbErr;

use crate::model::{LockRecord, NewLock, StorageMode};

/// Errors surfaced by lock stores
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// A record for the key already exists
    #[error("lock '{0}' already exists")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether the failure is a uniqueness violation on the lock key.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

/// Lock record persistence operations
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Insert a new record. Must fail with `StoreError::Conflict` if a record
    /// for the key exists, atomically with respect to concurrent inserts.
    async fn insert(&self, lock: &NewLock) -> Result<(), StoreError>;

    /// Get the record for a key
    async fn find_by_key(&self, key: &str) -> Result<Option<LockRecord>, StoreError>;

    /// Delete the record only while it still matches `record` (key, owner and
    /// deadline). Returns whether a row was removed.
    async fn delete(&self, record: &LockRecord) -> Result<bool, StoreError>;

    /// Round-trip to the backend to verify connectivity
    async fn health_check(&self) -> Result<(), StoreError>;

    /// Get the current storage mode
    fn storage_mode(&self) -> StorageMode;
}
