//! Domain model types for the persistence abstraction layer
//!
//! These types are what `LockStore` implementations accept and return,
//! decoupled from the SeaORM entity.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::lock;

/// A lease deadline as it came back from a store.
///
/// Relational backends usually hand back timestamps without zone information;
/// other writers may have recorded an explicit offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoredTimestamp {
    /// Wall-clock value without zone information, interpreted as UTC
    Naive(NaiveDateTime),
    /// Value carrying an explicit UTC offset
    Aware(DateTime<FixedOffset>),
}

impl StoredTimestamp {
    /// Normalize to a zone-aware UTC instant.
    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            StoredTimestamp::Naive(naive) => naive.and_utc(),
            StoredTimestamp::Aware(aware) => aware.with_timezone(&Utc),
        }
    }
}

impl From<NaiveDateTime> for StoredTimestamp {
    fn from(value: NaiveDateTime) -> Self {
        StoredTimestamp::Naive(value)
    }
}

impl From<DateTime<Utc>> for StoredTimestamp {
    fn from(value: DateTime<Utc>) -> Self {
        StoredTimestamp::Aware(value.fixed_offset())
    }
}

/// A lock row as read back from a store
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    pub key: String,
    pub owner: String,
    pub expires_at: Option<StoredTimestamp>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl LockRecord {
    /// Lease deadline normalized to UTC, if one was recorded.
    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        self.expires_at.as_ref().map(StoredTimestamp::to_utc)
    }

    /// Whether the lease is logically released at `now`.
    ///
    /// A record without a deadline never expires.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at_utc().is_some_and(|deadline| deadline <= now)
    }
}

impl From<lock::Model> for LockRecord {
    fn from(model: lock::Model) -> Self {
        Self {
            key: model.lock_key,
            owner: model.owner,
            expires_at: model.expires_at.map(StoredTimestamp::Naive),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Insert payload for a fresh lease
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewLock {
    pub key: String,
    pub owner: String,
    pub expires_at: DateTime<Utc>,
}

impl NewLock {
    pub fn new(key: impl Into<String>, owner: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            owner: owner.into(),
            expires_at,
        }
    }
}

/// Storage mode for the persistence layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageMode {
    /// External database (MySQL/PostgreSQL/SQLite via SeaORM)
    ExternalDb,
    /// Process-local map, no durability
    Memory,
}

impl std::fmt::Display for StorageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageMode::ExternalDb => write!(f, "external_db"),
            StorageMode::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for StorageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "external_db" => Ok(StorageMode::ExternalDb),
            "memory" => Ok(StorageMode::Memory),
            _ => Err(format!("Invalid storage mode: {}", s)),
        }
    }
}
