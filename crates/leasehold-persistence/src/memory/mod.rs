//! In-memory lock store
//!
//! Records live in a `DashMap` keyed by lock key. Only useful within a single
//! process, but it honors the same contract as the SQL store, which makes it
//! the store of choice for tests.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::model::{LockRecord, NewLock, StorageMode, StoredTimestamp};
use crate::traits::{LockStore, StoreError};

/// Process-local lock store
#[derive(Default)]
pub struct MemoryLockStore {
    records: DashMap<String, LockRecord>,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a record in place verbatim, replacing whatever was stored for its key.
    ///
    /// Models rows written by other processes, e.g. deadlines recorded with or
    /// without zone information.
    pub fn restore(&self, record: LockRecord) {
        self.records.insert(record.key.clone(), record);
    }

    /// Snapshot of the record for `key`
    pub fn get(&self, key: &str) -> Option<LockRecord> {
        self.records.get(key).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    async fn insert(&self, lock: &NewLock) -> Result<(), StoreError> {
        match self.records.entry(lock.key.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(lock.key.clone())),
            Entry::Vacant(slot) => {
                let now = Utc::now().naive_utc();
                slot.insert(LockRecord {
                    key: lock.key.clone(),
                    owner: lock.owner.clone(),
                    expires_at: Some(StoredTimestamp::Naive(lock.expires_at.naive_utc())),
                    created_at: Some(now),
                    updated_at: Some(now),
                });
                Ok(())
            }
        }
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<LockRecord>, StoreError> {
        Ok(self.get(key))
    }

    async fn delete(&self, record: &LockRecord) -> Result<bool, StoreError> {
        let removed = self.records.remove_if(&record.key, |_, current| {
            current.owner == record.owner && current.expires_at_utc() == record.expires_at_utc()
        });
        Ok(removed.is_some())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn storage_mode(&self) -> StorageMode {
        StorageMode::Memory
    }
}
