//! Snapshot-only lookups.
//!
//! `get_server`/`try_get_server`/`get_servers` never touch the live ring —
//! they read the most recently published [`ConfigurationSnapshot`] and
//! binary-search its virtual nodes. This is the key design decision behind
//! the ring: routing stability is decoupled from ongoing membership churn.

use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::hash::ring_position;
use crate::key::HashKey;
use crate::ring::core::HashRing;
use crate::snapshot::ConfigurationSnapshot;

/// Finds the index of the virtual node responsible for `ring_pos`:
/// exact match wins outright; otherwise the smallest hash greater than
/// `ring_pos`; otherwise (every hash is `<= ring_pos`) wrap to index 0.
fn locate<T>(snapshot: &ConfigurationSnapshot<T>, ring_pos: u32) -> Option<usize> {
    let nodes = snapshot.virtual_nodes();
    if nodes.is_empty() {
        return None;
    }
    match nodes.binary_search_by_key(&ring_pos, |vn| vn.hash) {
        Ok(idx) => Some(idx),
        Err(insertion) => Some(insertion % nodes.len()),
    }
}

impl<T> HashRing<T>
where
    T: Clone + Eq + Hash + Display + Send + Sync + 'static,
{
    /// The most recently published snapshot, if any.
    fn latest_snapshot(&self) -> Option<Arc<ConfigurationSnapshot<T>>> {
        self.state().read().history.last().cloned()
    }

    /// Returns the server responsible for `key`.
    ///
    /// Fails with [`Error::InvalidOperation`] if no snapshot has been
    /// published yet, or if the only published snapshots have no virtual
    /// nodes. Use [`HashRing::try_get_server`] if you'd rather get `None`
    /// than an error for the empty case.
    pub fn get_server<K: HashKey>(&self, key: K) -> Result<T> {
        let snapshot = self.latest_snapshot().ok_or_else(|| {
            Error::InvalidOperation(
                "No configuration snapshots available. Call create_configuration_snapshot."
                    .to_string(),
            )
        })?;

        let digest = snapshot.hash_algorithm().compute(key.key_bytes().as_ref());
        let ring_pos = ring_position(&digest);

        match locate(&snapshot, ring_pos) {
            Some(idx) => Ok(snapshot.virtual_nodes()[idx].server.clone()),
            None => Err(Error::InvalidOperation(
                "No configuration snapshots available. Call create_configuration_snapshot."
                    .to_string(),
            )),
        }
    }

    /// Like [`HashRing::get_server`] but returns `None` instead of an error
    /// when there's no usable snapshot.
    pub fn try_get_server<K: HashKey>(&self, key: K) -> Option<T> {
        let snapshot = self.latest_snapshot()?;
        let digest = snapshot.hash_algorithm().compute(key.key_bytes().as_ref());
        let ring_pos = ring_position(&digest);
        let idx = locate(&snapshot, ring_pos)?;
        Some(snapshot.virtual_nodes()[idx].server.clone())
    }

    /// Returns up to `count` distinct servers responsible for `key`, walking
    /// clockwise from the primary position and skipping servers already
    /// emitted. Deterministic for a given (snapshot, key, count).
    pub fn get_servers<K: HashKey>(&self, key: K, count: usize) -> Vec<T> {
        if count == 0 {
            return Vec::new();
        }
        let Some(snapshot) = self.latest_snapshot() else {
            return Vec::new();
        };
        let nodes = snapshot.virtual_nodes();
        if nodes.is_empty() {
            return Vec::new();
        }

        let digest = snapshot.hash_algorithm().compute(key.key_bytes().as_ref());
        let ring_pos = ring_position(&digest);
        let Some(start) = locate(&snapshot, ring_pos) else {
            return Vec::new();
        };

        let distinct_servers = snapshot.servers().len();
        let mut result = Vec::with_capacity(count.min(distinct_servers));
        let mut seen = std::collections::HashSet::with_capacity(count.min(distinct_servers));

        for offset in 0..nodes.len() {
            if result.len() >= count || result.len() >= distinct_servers {
                break;
            }
            let idx = (start + offset) % nodes.len();
            let server = &nodes[idx].server;
            if seen.insert(server.clone()) {
                result.push(server.clone());
            }
        }
        result
    }
}
