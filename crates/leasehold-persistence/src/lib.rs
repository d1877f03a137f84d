//! Leasehold Persistence - Lock record entity and storage backends
//!
//! This crate provides:
//! - The SeaORM entity for the `locks` table
//! - The `LockStore` trait the lock manager talks to
//! - An external database backend (MySQL/PostgreSQL/SQLite via SeaORM)
//! - An in-memory backend for single-process use and tests

pub mod entity;
pub mod memory;
pub mod model;
pub mod sql;
pub mod traits;

// Re-export sea-orm for convenience
pub use sea_orm;

// Re-export storage contract
pub use traits::{LockStore, StoreError};

// Re-export SQL backend
pub use sql::SqlLockStore;

// Re-export in-memory backend
pub use memory::MemoryLockStore;

// Re-export model types
pub use model::{LockRecord, NewLock, StorageMode, StoredTimestamp};
