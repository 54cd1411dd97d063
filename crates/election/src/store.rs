//! The abstract lease store contract and an in-memory fake used by tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::lease::LeaderInfo;

/// Builds the store key for `election_name` under `key_prefix`, following
/// the `"{key_prefix}:lease:{election_name}"` convention.
pub fn lease_key(key_prefix: &str, election_name: &str) -> String {
    format!("{key_prefix}:lease:{election_name}")
}

/// A key-value backed store for election leases.
///
/// Implementations must provide:
/// - an atomic conditional write for acquisition (set-if-absent with TTL),
/// - a fencing-by-participant-id conditional update for renewal,
/// - a fencing-by-participant-id conditional delete for release, and
/// - best-effort cleanup of expired leases on read.
///
/// `release_lease` must never propagate a transport error: a release that
/// can't reach the store is treated as `false`, not a failure, so callers
/// (including `Drop`/shutdown paths) can always call it without handling an
/// error they can't act on.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Atomically creates the lease iff no lease currently exists for
    /// `election_name`. Returns the created record on success, `None` if
    /// another participant already holds the lease.
    async fn try_acquire_lease(
        &self,
        election_name: &str,
        participant_id: &str,
        duration: chrono::Duration,
        metadata: Option<HashMap<String, String>>,
    ) -> Result<Option<LeaderInfo>>;

    /// Extends the lease's expiry and TTL iff it is currently held by
    /// `participant_id`. Returns the updated record on success, `None` if
    /// `participant_id` does not hold the lease (including if it doesn't
    /// exist).
    async fn try_renew_lease(
        &self,
        election_name: &str,
        participant_id: &str,
        duration: chrono::Duration,
    ) -> Result<Option<LeaderInfo>>;

    /// Deletes the lease iff it is currently held by `participant_id`.
    /// Returns `true` on success. Transport errors are swallowed and
    /// reported as `false` — release must be idempotent and non-fatal.
    async fn release_lease(&self, election_name: &str, participant_id: &str) -> bool;

    /// Reads the current lease, if any. A lease found to be expired is
    /// best-effort deleted and reported as absent.
    async fn get_current_lease(&self, election_name: &str) -> Result<Option<LeaderInfo>>;

    /// Convenience over [`LeaseStore::get_current_lease`].
    async fn has_valid_lease(&self, election_name: &str) -> Result<bool> {
        Ok(self.get_current_lease(election_name).await?.is_some())
    }

    /// Releases any resources held by the store. Idempotent: calling it
    /// more than once is not an error. After disposal every other method
    /// fails with [`crate::Error::ObjectDisposed`].
    async fn dispose(&self);
}

struct Entry {
    info: LeaderInfo,
    expires_at: DateTime<Utc>,
}

/// An in-process [`LeaseStore`] used by tests that exercise the election
/// state machine's fencing and single-leader properties without requiring a
/// live Redis server. Implements the same conditional-write, fencing, and
/// TTL-expiry semantics the trait contract demands.
#[derive(Default)]
pub struct InMemoryLeaseStore {
    leases: parking_lot::Mutex<HashMap<String, Entry>>,
    disposed: std::sync::atomic::AtomicBool,
}

impl InMemoryLeaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_disposed(&self) -> Result<()> {
        if self.disposed.load(std::sync::atomic::Ordering::Acquire) {
            return Err(crate::Error::ObjectDisposed);
        }
        Ok(())
    }

    fn prune_if_expired(leases: &mut HashMap<String, Entry>, key: &str) {
        if let Some(entry) = leases.get(key) {
            if entry.expires_at <= Utc::now() {
                leases.remove(key);
            }
        }
    }
}

#[async_trait]
impl LeaseStore for InMemoryLeaseStore {
    async fn try_acquire_lease(
        &self,
        election_name: &str,
        participant_id: &str,
        duration: chrono::Duration,
        metadata: Option<HashMap<String, String>>,
    ) -> Result<Option<LeaderInfo>> {
        self.check_disposed()?;
        let mut leases = self.leases.lock();
        Self::prune_if_expired(&mut leases, election_name);

        if leases.contains_key(election_name) {
            return Ok(None);
        }

        let now = Utc::now();
        let info = LeaderInfo::new(participant_id, now, now + duration, metadata);
        leases.insert(
            election_name.to_string(),
            Entry {
                info: info.clone(),
                expires_at: info.expires_at,
            },
        );
        Ok(Some(info))
    }

    async fn try_renew_lease(
        &self,
        election_name: &str,
        participant_id: &str,
        duration: chrono::Duration,
    ) -> Result<Option<LeaderInfo>> {
        self.check_disposed()?;
        let mut leases = self.leases.lock();
        Self::prune_if_expired(&mut leases, election_name);

        match leases.get(election_name) {
            Some(entry) if entry.info.participant_id == participant_id => {
                let now = Utc::now();
                let info = LeaderInfo::new(
                    participant_id,
                    entry.info.acquired_at,
                    now + duration,
                    entry.info.metadata.clone(),
                );
                leases.insert(
                    election_name.to_string(),
                    Entry {
                        info: info.clone(),
                        expires_at: info.expires_at,
                    },
                );
                Ok(Some(info))
            }
            _ => Ok(None),
        }
    }

    async fn release_lease(&self, election_name: &str, participant_id: &str) -> bool {
        if self.check_disposed().is_err() {
            return false;
        }
        let mut leases = self.leases.lock();
        match leases.get(election_name) {
            Some(entry) if entry.info.participant_id == participant_id => {
                leases.remove(election_name);
                true
            }
            _ => false,
        }
    }

    async fn get_current_lease(&self, election_name: &str) -> Result<Option<LeaderInfo>> {
        self.check_disposed()?;
        let mut leases = self.leases.lock();
        Self::prune_if_expired(&mut leases, election_name);
        Ok(leases.get(election_name).map(|e| e.info.clone()))
    }

    async fn dispose(&self) {
        self.disposed.store(true, std::sync::atomic::Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lease_key_follows_prefix_convention() {
        assert_eq!(lease_key("leader_election", "checkout"), "leader_election:lease:checkout");
    }

    #[tokio::test]
    async fn acquire_then_competing_acquire_fails() {
        let store = InMemoryLeaseStore::new();
        let first = store
            .try_acquire_lease("e", "p1", chrono::Duration::minutes(5), None)
            .await
            .unwrap();
        assert!(first.is_some());

        let second = store
            .try_acquire_lease("e", "p2", chrono::Duration::minutes(5), None)
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn fencing_rejects_renewal_and_release_by_non_holder() {
        let store = InMemoryLeaseStore::new();
        store
            .try_acquire_lease("e", "p1", chrono::Duration::minutes(5), None)
            .await
            .unwrap();

        assert!(store
            .try_renew_lease("e", "p2", chrono::Duration::minutes(5))
            .await
            .unwrap()
            .is_none());
        assert!(!store.release_lease("e", "p2").await);

        let current = store.get_current_lease("e").await.unwrap().unwrap();
        assert_eq!(current.participant_id, "p1");
    }

    #[tokio::test]
    async fn expired_lease_is_pruned_on_read() {
        let store = InMemoryLeaseStore::new();
        store
            .try_acquire_lease("e", "p1", chrono::Duration::milliseconds(-1), None)
            .await
            .unwrap();

        assert!(store.get_current_lease("e").await.unwrap().is_none());
        assert!(!store.has_valid_lease("e").await.unwrap());
    }

    #[tokio::test]
    async fn dispose_fails_subsequent_operations() {
        let store = InMemoryLeaseStore::new();
        store.dispose().await;
        store.dispose().await; // idempotent

        let err = store
            .try_acquire_lease("e", "p1", chrono::Duration::minutes(5), None)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::ObjectDisposed));
        assert!(!store.release_lease("e", "p1").await);
    }
}
