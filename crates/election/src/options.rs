//! Configurable knobs for [`crate::LeaderElectionService`] and its lease
//! store.

use std::sync::Arc;

use chrono::Duration;

use crate::error::{Error, Result};
use crate::store::LeaseStore;

/// Options governing lease lifetime, renewal/retry cadence, and the key
/// namespace a [`crate::LeaderElectionService`] uses.
#[derive(Clone)]
pub struct RedisLeaderElectionOptions {
    /// Shared handle to the lease store. Required.
    pub store: Arc<dyn LeaseStore>,
    /// Namespace prefix for lease keys (`"{key_prefix}:lease:{election_name}"`).
    pub key_prefix: String,
    /// How long an acquired or renewed lease remains valid.
    pub lease_duration: Duration,
    /// How often a leader renews its lease.
    pub renewal_interval: Duration,
    /// How often a non-leader retries acquisition.
    pub retry_interval: Duration,
    /// Timeout applied to individual store operations.
    pub operation_timeout: Duration,
    /// Opaque metadata attached to leases acquired by this service.
    pub metadata: Option<std::collections::HashMap<String, String>>,
    /// When `true` (the default), the service schedules periodic
    /// acquisition attempts and renewals in the background after
    /// `start_async`. When `false`, leadership only changes in response to
    /// explicit `try_acquire_leadership`/`release_leadership` calls.
    pub enable_continuous_check: bool,
}

impl RedisLeaderElectionOptions {
    /// Options with a given store, `"leader_election"` key prefix, a 30s
    /// lease duration, 10s renewal interval, 5s retry interval, and
    /// continuous checking enabled.
    pub fn new(store: Arc<dyn LeaseStore>) -> Self {
        Self {
            store,
            key_prefix: "leader_election".to_string(),
            lease_duration: Duration::seconds(30),
            renewal_interval: Duration::seconds(10),
            retry_interval: Duration::seconds(5),
            operation_timeout: Duration::seconds(5),
            metadata: None,
            enable_continuous_check: true,
        }
    }

    /// Confirms `key_prefix` is non-empty and not whitespace-only.
    ///
    /// The source contract also requires a non-null serializer; this port
    /// has no pluggable serializer (lease records always go through
    /// `serde_json`), so that check has no realizable failure mode and is
    /// omitted rather than modeled with an abstraction nothing needs.
    pub fn validate(self) -> Result<Self> {
        if self.key_prefix.trim().is_empty() {
            return Err(Error::ValidationError(
                "key_prefix must not be empty or whitespace-only".to_string(),
            ));
        }
        Ok(self)
    }
}
