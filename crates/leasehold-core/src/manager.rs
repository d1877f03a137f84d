//! Lock manager
//!
//! `acquire` and `release` each make one bounded pass over the store: at most
//! two inserts, one lookup and one delete. Neither blocks waiting for a lock;
//! callers that want blocking semantics poll with their own backoff.
//!
//! Every outcome is a `bool`. Store failures are logged and reported as
//! `false`, so a caller never believes it holds a lock it might not hold.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use leasehold_persistence::{LockRecord, LockStore, NewLock, StoreError};
use tracing::{debug, error, warn};

use crate::settings::LockSettings;

/// Lease-based lock manager over a shared `LockStore`
///
/// Holds no lock state of its own; any number of managers, in any number of
/// processes, may share one store.
pub struct LockManager {
    store: Arc<dyn LockStore>,
    settings: LockSettings,
}

impl LockManager {
    /// Create a manager with default settings
    pub fn new(store: Arc<dyn LockStore>) -> Self {
        Self::with_settings(store, LockSettings::default())
    }

    pub fn with_settings(store: Arc<dyn LockStore>, settings: LockSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &LockSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn LockStore> {
        &self.store
    }

    /// Acquire `key` for `owner` with the configured default lease duration.
    pub async fn acquire_default(&self, key: &str, owner: &str) -> bool {
        self.acquire(key, owner, self.settings.default_ttl_seconds)
            .await
    }

    /// Try to acquire `key` for `owner` with a lease of `ttl_seconds`.
    ///
    /// Returns `true` only if this call created the lock record. An expired
    /// record left by another owner is removed and the insert retried once;
    /// losing that retry to a competing caller returns `false`.
    ///
    /// A `ttl_seconds` of zero or less creates a lease that is already expired.
    pub async fn acquire(&self, key: &str, owner: &str, ttl_seconds: i64) -> bool {
        if key.is_empty() || owner.is_empty() {
            warn!(key = %key, owner = %owner, "Refusing lock with empty key or owner");
            return false;
        }

        let now = Utc::now();
        let Some(expires_at) = lease_deadline(now, ttl_seconds) else {
            warn!(key = %key, ttl_seconds, "Lease deadline out of range");
            return false;
        };
        let lock = NewLock::new(key, owner, expires_at);

        match self.store.insert(&lock).await {
            Ok(()) => {
                debug!(key = %key, owner = %owner, ttl_seconds, "Lock acquired (created)");
                return true;
            }
            Err(StoreError::Conflict(_)) => {
                debug!(key = %key, "Lock key already taken, inspecting holder");
            }
            Err(e) => {
                // Not a key conflict, but the row may still exist; let the
                // lookup below decide
                warn!(key = %key, error = %e, "Failed to create lock");
            }
        }

        let existing = match self.store.find_by_key(key).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!(key = %key, "Conflicting lock vanished before lookup");
                return false;
            }
            Err(e) => {
                error!(key = %key, error = %e, "Error querying existing lock");
                return false;
            }
        };

        if !existing.is_expired_at(now) {
            debug!(
                key = %key,
                holder = %existing.owner,
                expires_at = ?existing.expires_at_utc(),
                "Lock is currently held by another owner"
            );
            return false;
        }

        self.reclaim(&lock, &existing).await
    }

    /// Remove an expired record and make the single retry insert.
    async fn reclaim(&self, lock: &NewLock, stale: &LockRecord) -> bool {
        debug!(
            key = %lock.key,
            previous_owner = %stale.owner,
            "Found expired lock, removing and retrying"
        );

        match self.store.delete(stale).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(key = %lock.key, "Expired lock was already removed or replaced");
            }
            Err(e) => {
                error!(key = %lock.key, error = %e, "Failed to delete expired lock");
                return false;
            }
        }

        match self.store.insert(lock).await {
            Ok(()) => {
                debug!(key = %lock.key, owner = %lock.owner, "Lock acquired (reclaimed)");
                true
            }
            Err(e) => {
                debug!(
                    key = %lock.key,
                    error = %e,
                    "Failed to recreate lock after deleting expired one"
                );
                false
            }
        }
    }

    /// Release `key` if it is held by `owner`.
    ///
    /// Releasing a key with no record succeeds, so release is idempotent for
    /// the rightful owner. A record held by anyone else is never touched,
    /// whether or not its lease has expired.
    pub async fn release(&self, key: &str, owner: &str) -> bool {
        if key.is_empty() || owner.is_empty() {
            warn!(key = %key, owner = %owner, "Refusing release with empty key or owner");
            return false;
        }

        let existing = match self.store.find_by_key(key).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!(key = %key, "No lock to release");
                return true;
            }
            Err(e) => {
                error!(key = %key, error = %e, "Error querying lock for release");
                return false;
            }
        };

        if existing.owner != owner {
            warn!(
                key = %key,
                owner = %owner,
                holder = %existing.owner,
                "Refusing to release lock held by another owner"
            );
            return false;
        }

        match self.store.delete(&existing).await {
            Ok(removed) => {
                if !removed {
                    debug!(key = %key, "Lock was removed concurrently");
                }
                debug!(key = %key, owner = %owner, "Lock released");
                true
            }
            Err(e) => {
                error!(key = %key, error = %e, "Failed to release lock");
                false
            }
        }
    }
}

/// `now + ttl_seconds`, or `None` if it leaves the representable range.
fn lease_deadline(now: DateTime<Utc>, ttl_seconds: i64) -> Option<DateTime<Utc>> {
    TimeDelta::try_seconds(ttl_seconds).and_then(|ttl| now.checked_add_signed(ttl))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{Duration, FixedOffset};
    use leasehold_persistence::{MemoryLockStore, StorageMode, StoredTimestamp};

    use super::*;

    /// Memory store with switchable failures
    #[derive(Default)]
    struct FaultyStore {
        inner: MemoryLockStore,
        fail_insert: AtomicBool,
        always_conflict: AtomicBool,
        fail_find: AtomicBool,
        fail_delete: AtomicBool,
        inserts: AtomicUsize,
    }

    fn unavailable() -> StoreError {
        StoreError::Unavailable("injected failure".to_string())
    }

    #[async_trait]
    impl LockStore for FaultyStore {
        async fn insert(&self, lock: &NewLock) -> Result<(), StoreError> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            if self.fail_insert.load(Ordering::SeqCst) {
                return Err(unavailable());
            }
            if self.always_conflict.load(Ordering::SeqCst) {
                return Err(StoreError::Conflict(lock.key.clone()));
            }
            self.inner.insert(lock).await
        }

        async fn find_by_key(&self, key: &str) -> Result<Option<LockRecord>, StoreError> {
            if self.fail_find.load(Ordering::SeqCst) {
                return Err(unavailable());
            }
            self.inner.find_by_key(key).await
        }

        async fn delete(&self, record: &LockRecord) -> Result<bool, StoreError> {
            if self.fail_delete.load(Ordering::SeqCst) {
                return Err(unavailable());
            }
            self.inner.delete(record).await
        }

        async fn health_check(&self) -> Result<(), StoreError> {
            Ok(())
        }

        fn storage_mode(&self) -> StorageMode {
            StorageMode::Memory
        }
    }

    fn create_test_manager() -> (LockManager, Arc<MemoryLockStore>) {
        let store = Arc::new(MemoryLockStore::new());
        (LockManager::new(store.clone()), store)
    }

    fn create_faulty_manager() -> (LockManager, Arc<FaultyStore>) {
        let store = Arc::new(FaultyStore::default());
        (LockManager::new(store.clone()), store)
    }

    fn seeded(key: &str, owner: &str, expires_at: Option<StoredTimestamp>) -> LockRecord {
        LockRecord {
            key: key.to_string(),
            owner: owner.to_string(),
            expires_at,
            created_at: None,
            updated_at: None,
        }
    }

    // ==================== Acquire ====================

    #[tokio::test]
    async fn test_acquire_free_key() {
        let (manager, store) = create_test_manager();

        assert!(manager.acquire("job:1", "worker-a", 30).await);

        let record = store.get("job:1").unwrap();
        assert_eq!(record.owner, "worker-a");
        let remaining = record.expires_at_utc().unwrap() - Utc::now();
        assert!(remaining > Duration::seconds(25) && remaining <= Duration::seconds(30));
    }

    #[tokio::test]
    async fn test_live_lease_blocks_other_owner() {
        let (manager, store) = create_test_manager();

        assert!(manager.acquire("job:1", "worker-a", 30).await);
        assert!(!manager.acquire("job:1", "worker-b", 30).await);
        assert_eq!(store.get("job:1").unwrap().owner, "worker-a");
    }

    #[tokio::test]
    async fn test_live_lease_is_not_reentrant() {
        let (manager, _store) = create_test_manager();

        assert!(manager.acquire("job:1", "worker-a", 30).await);
        assert!(!manager.acquire("job:1", "worker-a", 30).await);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let (manager, _store) = create_test_manager();

        assert!(manager.acquire("job:1", "worker-a", 30).await);
        assert!(manager.acquire("job:2", "worker-b", 30).await);
    }

    #[tokio::test]
    async fn test_expired_lease_is_reclaimed() {
        let (manager, store) = create_test_manager();

        assert!(manager.acquire("job:1", "worker-a", 0).await);
        assert!(manager.acquire("job:1", "worker-b", 30).await);
        assert_eq!(store.get("job:1").unwrap().owner, "worker-b");

        // Ownership moved; the old holder cannot release
        assert!(!manager.release("job:1", "worker-a").await);
        assert_eq!(store.get("job:1").unwrap().owner, "worker-b");
    }

    #[tokio::test]
    async fn test_negative_ttl_is_already_expired() {
        let (manager, _store) = create_test_manager();

        assert!(manager.acquire("job:1", "worker-a", -60).await);
        assert!(manager.acquire("job:1", "worker-b", 30).await);
    }

    #[tokio::test]
    async fn test_naive_deadline_is_treated_as_utc() {
        let (manager, store) = create_test_manager();
        let past = (Utc::now() - Duration::seconds(60)).naive_utc();
        store.restore(seeded("job:1", "worker-a", Some(StoredTimestamp::Naive(past))));

        assert!(manager.acquire("job:1", "worker-b", 30).await);

        let future = (Utc::now() + Duration::seconds(60)).naive_utc();
        store.restore(seeded("job:2", "worker-a", Some(StoredTimestamp::Naive(future))));

        assert!(!manager.acquire("job:2", "worker-b", 30).await);
    }

    #[tokio::test]
    async fn test_offset_deadline_compared_as_instant() {
        let (manager, store) = create_test_manager();
        // Expired a minute ago, but the +05:00 wall clock reads hours ahead
        let offset = FixedOffset::east_opt(5 * 3600).unwrap();
        let past = (Utc::now() - Duration::seconds(60)).with_timezone(&offset);
        store.restore(seeded("job:1", "worker-a", Some(StoredTimestamp::Aware(past))));

        assert!(manager.acquire("job:1", "worker-b", 30).await);
        assert_eq!(store.get("job:1").unwrap().owner, "worker-b");
    }

    #[tokio::test]
    async fn test_record_without_deadline_is_never_reclaimed() {
        let (manager, store) = create_test_manager();
        store.restore(seeded("job:1", "worker-a", None));

        assert!(!manager.acquire("job:1", "worker-b", 30).await);
        assert_eq!(store.get("job:1").unwrap().owner, "worker-a");

        // Only an explicit release frees it
        assert!(manager.release("job:1", "worker-a").await);
        assert!(manager.acquire("job:1", "worker-b", 30).await);
    }

    #[tokio::test]
    async fn test_acquire_default_uses_settings() {
        let store = Arc::new(MemoryLockStore::new());
        let manager = LockManager::with_settings(
            store.clone(),
            LockSettings {
                default_ttl_seconds: 0,
            },
        );

        assert!(manager.acquire_default("job:1", "worker-a").await);
        assert!(manager.acquire_default("job:1", "worker-b").await);
        assert_eq!(store.get("job:1").unwrap().owner, "worker-b");
    }

    #[tokio::test]
    async fn test_acquire_default_ttl_is_thirty_seconds() {
        let (manager, store) = create_test_manager();

        assert!(manager.acquire_default("job:1", "worker-a").await);
        let remaining = store.get("job:1").unwrap().expires_at_utc().unwrap() - Utc::now();
        assert!(remaining > Duration::seconds(25) && remaining <= Duration::seconds(30));
    }

    #[tokio::test]
    async fn test_empty_identifiers_are_refused() {
        let (manager, store) = create_test_manager();

        assert!(!manager.acquire("", "worker-a", 30).await);
        assert!(!manager.acquire("job:1", "", 30).await);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_ttl_fails_closed() {
        let (manager, store) = create_test_manager();

        assert!(!manager.acquire("job:1", "worker-a", i64::MAX).await);
        assert!(store.is_empty());
    }

    // ==================== Acquire failure paths ====================

    #[tokio::test]
    async fn test_lookup_failure_after_conflict_fails_closed() {
        let (manager, store) = create_faulty_manager();
        assert!(manager.acquire("job:1", "worker-a", 0).await);

        store.fail_find.store(true, Ordering::SeqCst);
        assert!(!manager.acquire("job:1", "worker-b", 30).await);
        assert_eq!(store.inner.get("job:1").unwrap().owner, "worker-a");
    }

    #[tokio::test]
    async fn test_vanished_conflict_does_not_retry() {
        let (manager, store) = create_faulty_manager();
        store.always_conflict.store(true, Ordering::SeqCst);

        assert!(!manager.acquire("job:1", "worker-a", 30).await);
        assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_insert_failure_without_record_fails_closed() {
        let (manager, store) = create_faulty_manager();
        store.fail_insert.store(true, Ordering::SeqCst);

        assert!(!manager.acquire("job:1", "worker-a", 30).await);
        assert!(store.inner.is_empty());
    }

    #[tokio::test]
    async fn test_insert_failure_with_live_record_reports_held() {
        let (manager, store) = create_faulty_manager();
        assert!(manager.acquire("job:1", "worker-a", 30).await);

        store.fail_insert.store(true, Ordering::SeqCst);
        assert!(!manager.acquire("job:1", "worker-b", 30).await);
        assert_eq!(store.inner.get("job:1").unwrap().owner, "worker-a");
    }

    #[tokio::test]
    async fn test_delete_failure_during_reclaim_fails_closed() {
        let (manager, store) = create_faulty_manager();
        assert!(manager.acquire("job:1", "worker-a", 0).await);

        store.fail_delete.store(true, Ordering::SeqCst);
        assert!(!manager.acquire("job:1", "worker-b", 30).await);
        assert_eq!(store.inner.get("job:1").unwrap().owner, "worker-a");
    }

    #[tokio::test]
    async fn test_reclaim_retries_insert_only_once() {
        let (manager, store) = create_faulty_manager();
        assert!(manager.acquire("job:1", "worker-a", 0).await);
        store.inserts.store(0, Ordering::SeqCst);

        // Every insert collides, as if another reclaimer keeps winning
        store.always_conflict.store(true, Ordering::SeqCst);
        assert!(!manager.acquire("job:1", "worker-b", 30).await);
        assert_eq!(store.inserts.load(Ordering::SeqCst), 2);
    }

    // ==================== Release ====================

    #[tokio::test]
    async fn test_release_absent_key() {
        let (manager, _store) = create_test_manager();
        assert!(manager.release("job:1", "worker-a").await);
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let (manager, store) = create_test_manager();

        assert!(manager.acquire("job:1", "worker-a", 30).await);
        assert!(manager.release("job:1", "worker-a").await);
        assert!(manager.release("job:1", "worker-a").await);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_release_by_other_owner_is_refused() {
        let (manager, store) = create_test_manager();

        assert!(manager.acquire("job:1", "worker-a", 30).await);
        assert!(!manager.release("job:1", "worker-b").await);
        assert_eq!(store.get("job:1").unwrap().owner, "worker-a");
    }

    #[tokio::test]
    async fn test_release_by_other_owner_refused_even_when_expired() {
        let (manager, store) = create_test_manager();

        assert!(manager.acquire("job:1", "worker-a", 0).await);
        assert!(!manager.release("job:1", "worker-b").await);
        assert_eq!(store.get("job:1").unwrap().owner, "worker-a");
    }

    #[tokio::test]
    async fn test_owner_may_release_own_expired_lease() {
        let (manager, store) = create_test_manager();

        assert!(manager.acquire("job:1", "worker-a", 0).await);
        assert!(manager.release("job:1", "worker-a").await);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_reacquire_after_release() {
        let (manager, store) = create_test_manager();

        assert!(manager.acquire("job:1", "worker-a", 30).await);
        assert!(manager.release("job:1", "worker-a").await);
        assert!(manager.acquire("job:1", "worker-b", 30).await);
        assert_eq!(store.get("job:1").unwrap().owner, "worker-b");
    }

    #[tokio::test]
    async fn test_release_empty_identifiers_are_refused() {
        let (manager, _store) = create_test_manager();

        assert!(!manager.release("", "worker-a").await);
        assert!(!manager.release("job:1", "").await);
    }

    #[tokio::test]
    async fn test_release_lookup_failure_fails_closed() {
        let (manager, store) = create_faulty_manager();
        assert!(manager.acquire("job:1", "worker-a", 30).await);

        store.fail_find.store(true, Ordering::SeqCst);
        assert!(!manager.release("job:1", "worker-a").await);
        assert!(store.inner.get("job:1").is_some());
    }

    #[tokio::test]
    async fn test_release_delete_failure_reports_false() {
        let (manager, store) = create_faulty_manager();
        assert!(manager.acquire("job:1", "worker-a", 30).await);

        store.fail_delete.store(true, Ordering::SeqCst);
        assert!(!manager.release("job:1", "worker-a").await);
        assert!(store.inner.get("job:1").is_some());
    }

    // ==================== Helpers ====================

    #[test]
    fn test_lease_deadline() {
        let now = Utc::now();
        assert_eq!(lease_deadline(now, 30), Some(now + Duration::seconds(30)));
        assert_eq!(lease_deadline(now, 0), Some(now));
        assert_eq!(lease_deadline(now, -5), Some(now - Duration::seconds(5)));
        assert_eq!(lease_deadline(now, i64::MAX), None);
    }
}
