//! Redis-backed [`LeaseStore`].
//!
//! Acquisition is a single atomic `SET key value NX EX ttl` — not `SETNX`
//! followed by a separate `EXPIRE`, which would leave a window where a
//! crash between the two commands leaves a key with no TTL. Renewal and
//! release run as Lua scripts (`EVAL`) so the participant-identity check and
//! the mutation happen as one atomic unit at the server; the identity check
//! is a substring match over the serialized lease (permitted by the lease
//! store contract, and simpler than teaching the script to parse JSON).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::error::{Error, Result};
use crate::lease::LeaderInfo;
use crate::store::{lease_key, LeaseStore};

const RENEW_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if current == false then
  return false
end
local needle = '"ParticipantId":"' .. ARGV[1] .. '"'
if string.find(current, needle, 1, true) == nil then
  return false
end
redis.call('SET', KEYS[1], ARGV[2], 'EX', ARGV[3])
return ARGV[2]
"#;

const RELEASE_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if current == false then
  return 0
end
local needle = '"ParticipantId":"' .. ARGV[1] .. '"'
if string.find(current, needle, 1, true) == nil then
  return 0
end
redis.call('DEL', KEYS[1])
return 1
"#;

/// A [`LeaseStore`] backed by a shared Redis instance.
pub struct RedisLeaseStore {
    manager: ConnectionManager,
    key_prefix: String,
    disposed: std::sync::atomic::AtomicBool,
}

impl RedisLeaseStore {
    /// Connects to `redis_url` and returns a store using `key_prefix` for
    /// its key namespace (`"{key_prefix}:lease:{election_name}"`).
    pub async fn connect(redis_url: &str, key_prefix: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let manager = client.get_connection_manager().await?;
        Ok(Self::new(manager, key_prefix))
    }

    /// Builds a store from an already-established connection manager.
    pub fn new(manager: ConnectionManager, key_prefix: impl Into<String>) -> Self {
        Self {
            manager,
            key_prefix: key_prefix.into(),
            disposed: std::sync::atomic::AtomicBool::new(false),
        }
    }

    fn check_disposed(&self) -> Result<()> {
        if self.disposed.load(std::sync::atomic::Ordering::Acquire) {
            return Err(Error::ObjectDisposed);
        }
        Ok(())
    }

    fn ttl_seconds(duration: chrono::Duration) -> i64 {
        duration.num_seconds().max(1)
    }
}

#[async_trait]
impl LeaseStore for RedisLeaseStore {
    async fn try_acquire_lease(
        &self,
        election_name: &str,
        participant_id: &str,
        duration: chrono::Duration,
        metadata: Option<HashMap<String, String>>,
    ) -> Result<Option<LeaderInfo>> {
        self.check_disposed()?;
        let key = lease_key(&self.key_prefix, election_name);
        let now = Utc::now();
        let info = LeaderInfo::new(participant_id, now, now + duration, metadata);
        let value = serde_json::to_string(&info)?;

        let mut conn = self.manager.clone();
        let set: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(&value)
            .arg("NX")
            .arg("EX")
            .arg(Self::ttl_seconds(duration))
            .query_async(&mut conn)
            .await?;

        if set.is_some() {
            tracing::debug!(election = election_name, participant = participant_id, "lease acquired");
            Ok(Some(info))
        } else {
            Ok(None)
        }
    }

    async fn try_renew_lease(
        &self,
        election_name: &str,
        participant_id: &str,
        duration: chrono::Duration,
    ) -> Result<Option<LeaderInfo>> {
        self.check_disposed()?;
        let key = lease_key(&self.key_prefix, election_name);

        // We need the existing record's acquired_at to carry forward; fetch
        // it first, then let the script enforce the fencing check
        // atomically against whatever is actually stored.
        let current = self.get_current_lease(election_name).await?;
        let Some(current) = current else {
            return Ok(None);
        };
        if current.participant_id != participant_id {
            return Ok(None);
        }

        let now = Utc::now();
        let info = LeaderInfo::new(participant_id, current.acquired_at, now + duration, current.metadata);
        let value = serde_json::to_string(&info)?;

        let mut conn = self.manager.clone();
        let result: Option<String> = redis::Script::new(RENEW_SCRIPT)
            .key(&key)
            .arg(participant_id)
            .arg(&value)
            .arg(Self::ttl_seconds(duration))
            .invoke_async(&mut conn)
            .await?;

        match result {
            Some(_) => {
                tracing::debug!(election = election_name, participant = participant_id, "lease renewed");
                Ok(Some(info))
            }
            None => Ok(None),
        }
    }

    async fn release_lease(&self, election_name: &str, participant_id: &str) -> bool {
        if self.check_disposed().is_err() {
            return false;
        }
        let key = lease_key(&self.key_prefix, election_name);
        let mut conn = self.manager.clone();
        let result: redis::RedisResult<i64> = redis::Script::new(RELEASE_SCRIPT)
            .key(&key)
            .arg(participant_id)
            .invoke_async(&mut conn)
            .await;

        match result {
            Ok(1) => {
                tracing::debug!(election = election_name, participant = participant_id, "lease released");
                true
            }
            Ok(_) => false,
            Err(err) => {
                tracing::warn!(election = election_name, error = %err, "release_lease transport error, treating as false");
                false
            }
        }
    }

    async fn get_current_lease(&self, election_name: &str) -> Result<Option<LeaderInfo>> {
        self.check_disposed()?;
        let key = lease_key(&self.key_prefix, election_name);
        let mut conn = self.manager.clone();
        let raw: Option<String> = conn.get(&key).await?;

        let Some(raw) = raw.filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        let info: LeaderInfo = serde_json::from_str(&raw)?;
        if info.expires_at <= Utc::now() {
            let _: redis::RedisResult<()> = conn.del(&key).await;
            return Ok(None);
        }
        Ok(Some(info))
    }

    async fn dispose(&self) {
        self.disposed.store(true, std::sync::atomic::Ordering::Release);
    }
}
