//! Live ring state: server membership, virtual-node counts, and snapshot
//! history. See `lookup.rs` for the snapshot-only read path.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::hash::HashAlgorithm;
use crate::options::{HashRingOptions, HistoryPolicy};
use crate::snapshot::ConfigurationSnapshot;
use crate::vnode;

pub(crate) struct RingState<T> {
    /// Insertion order, each server present at most once. Order matters: it
    /// determines tie-breaking when two virtual nodes land on the same
    /// hash, since snapshot construction sorts by hash with a stable sort.
    servers: Vec<T>,
    vnode_counts: HashMap<T, u32>,
    pub(crate) history: Vec<Arc<ConfigurationSnapshot<T>>>,
}

impl<T> RingState<T> {
    fn new() -> Self {
        Self {
            servers: Vec::new(),
            vnode_counts: HashMap::new(),
            history: Vec::new(),
        }
    }
}

/// A consistent hash ring mapping keys to servers of type `T` via virtual
/// nodes and SHA-1/MD5-family hashing.
///
/// Mutations (`add`, `remove`, `clear`, ...) apply to the *live* ring only.
/// Lookups (`get_server`, ...) read exclusively from the most recently
/// published [`ConfigurationSnapshot`] — call [`HashRing::create_configuration_snapshot`]
/// to make live mutations visible to lookups. This decouples routing
/// stability from ongoing membership churn: a long-lived reader can keep
/// routing against a snapshot while the ring is mutated underneath it.
///
/// Cloning a `HashRing` is cheap and shares the same underlying state: it's
/// a handle, not a deep copy, so every clone observes the same live ring
/// and the same snapshot history.
pub struct HashRing<T> {
    state: Arc<RwLock<RingState<T>>>,
    default_virtual_nodes: u32,
    max_history_size: u32,
    history_policy: HistoryPolicy,
    hash_algorithm: Arc<dyn HashAlgorithm>,
}

impl<T> Clone for HashRing<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            default_virtual_nodes: self.default_virtual_nodes,
            max_history_size: self.max_history_size,
            history_policy: self.history_policy,
            hash_algorithm: Arc::clone(&self.hash_algorithm),
        }
    }
}

impl<T> HashRing<T>
where
    T: Clone + Eq + Hash + Display + Send + Sync + 'static,
{
    /// A ring with default options: SHA-1, 42 virtual nodes per server,
    /// history bounded to 3 snapshots with FIFO eviction.
    pub fn new() -> Self {
        Self::with_options(HashRingOptions::default()).expect("defaults are always valid")
    }

    /// A ring built from explicit [`HashRingOptions`].
    pub fn with_options(options: HashRingOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            state: Arc::new(RwLock::new(RingState::new())),
            default_virtual_nodes: options.default_virtual_nodes,
            max_history_size: options.max_history_size,
            history_policy: options.history_policy,
            hash_algorithm: options.hash_algorithm,
        })
    }

    /// A ring using `algorithm` with the default vnode/history settings.
    pub fn with_algorithm(algorithm: Arc<dyn HashAlgorithm>) -> Self {
        Self::with_options(HashRingOptions {
            hash_algorithm: algorithm,
            ..HashRingOptions::default()
        })
        .expect("defaults with a substituted algorithm are always valid")
    }

    /// A ring using `algorithm` and `default_vnodes` as the per-server vnode
    /// count when none is given explicitly to [`HashRing::add`].
    pub fn with_algorithm_and_vnodes(algorithm: Arc<dyn HashAlgorithm>, default_vnodes: u32) -> Result<Self> {
        Self::with_options(HashRingOptions {
            hash_algorithm: algorithm,
            default_virtual_nodes: default_vnodes,
            ..HashRingOptions::default()
        })
    }

    pub(crate) fn hash_algorithm(&self) -> &Arc<dyn HashAlgorithm> {
        &self.hash_algorithm
    }

    pub(crate) fn state(&self) -> &Arc<RwLock<RingState<T>>> {
        &self.state
    }

    // ---- queries ----------------------------------------------------

    /// Servers currently in the live ring, in insertion order.
    pub fn servers(&self) -> Vec<T> {
        self.state.read().servers.clone()
    }

    /// Total virtual nodes across all live servers.
    pub fn virtual_node_count(&self) -> u32 {
        self.state.read().vnode_counts.values().sum()
    }

    /// `true` if the live ring has no servers.
    pub fn is_empty(&self) -> bool {
        self.state.read().servers.is_empty()
    }

    /// Number of snapshots currently retained in history.
    pub fn history_count(&self) -> u32 {
        self.state.read().history.len() as u32
    }

    /// The configured history bound.
    pub fn max_history_size(&self) -> u32 {
        self.max_history_size
    }

    /// Name of the hash algorithm used to place virtual nodes and locate
    /// keys (e.g. `"SHA1"`, `"MD5"`), for diagnostics and display.
    pub fn hash_algorithm_name(&self) -> &'static str {
        self.hash_algorithm.name()
    }

    // ---- mutations ----------------------------------------------------

    /// Adds `server` with `vnodes` virtual nodes (or the ring's default if
    /// `vnodes` is `None`). Replaces any prior placement of `server` — this
    /// is idempotent-by-replacement, not additive.
    pub fn add(&self, server: T, vnodes: Option<u32>) -> Result<()> {
        let vnodes = vnodes.unwrap_or(self.default_virtual_nodes);
        if vnodes == 0 {
            return Err(Error::OutOfRange("vnodes must be >= 1".to_string()));
        }
        let mut state = self.state.write();
        if !state.vnode_counts.contains_key(&server) {
            state.servers.push(server.clone());
        }
        state.vnode_counts.insert(server.clone(), vnodes);
        tracing::debug!(server = %server, vnodes, algorithm = self.hash_algorithm.name(), "added server to ring");
        Ok(())
    }

    /// Removes `server` and its virtual nodes from the live ring. Returns
    /// whether it was present.
    pub fn remove(&self, server: &T) -> bool {
        let mut state = self.state.write();
        let removed = state.vnode_counts.remove(server).is_some();
        if removed {
            state.servers.retain(|s| s != server);
            tracing::debug!(server = %server, "removed server from ring");
        }
        removed
    }

    /// Membership check against the live ring.
    pub fn contains(&self, server: &T) -> bool {
        self.state.read().vnode_counts.contains_key(server)
    }

    /// Drops all live-ring contents. History is untouched: snapshots taken
    /// before `clear()` remain valid for lookups until replaced.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.servers.clear();
        state.vnode_counts.clear();
        tracing::debug!("cleared live ring");
    }

    /// Adds every `(server, vnodes)` pair atomically: either all are applied
    /// or, on the first invalid count, none are and the live ring is
    /// unchanged.
    pub fn add_range<I>(&self, servers: I) -> Result<()>
    where
        I: IntoIterator<Item = (T, u32)>,
    {
        let pairs: Vec<(T, u32)> = servers.into_iter().collect();
        if let Some((_, bad)) = pairs.iter().find(|(_, v)| *v == 0) {
            let _ = bad;
            return Err(Error::OutOfRange("vnodes must be >= 1".to_string()));
        }

        let mut state = self.state.write();
        // Build the shadow state off the current one, then swap it in. A
        // reader holding the write lock out never observes a partially
        // applied batch because we only touch `state` once all pairs have
        // been validated above.
        for (server, vnodes) in pairs {
            if !state.vnode_counts.contains_key(&server) {
                state.servers.push(server.clone());
            }
            state.vnode_counts.insert(server, vnodes);
        }
        Ok(())
    }

    /// Adds every server in `servers` using the ring's default vnode count,
    /// atomically (see [`HashRing::add_range`]).
    pub fn add_range_default<I>(&self, servers: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
    {
        let default = self.default_virtual_nodes;
        self.add_range(servers.into_iter().map(move |s| (s, default)))
    }

    /// Removes each present server in `servers`. Returns the count actually
    /// removed.
    pub fn remove_range<I>(&self, servers: I) -> usize
    where
        I: IntoIterator<Item = T>,
    {
        let mut state = self.state.write();
        let mut removed = 0usize;
        for server in servers {
            if state.vnode_counts.remove(&server).is_some() {
                state.servers.retain(|s| s != &server);
                removed += 1;
            }
        }
        removed
    }

    // ---- snapshots & history ------------------------------------------

    /// Freezes the current live ring into a new [`ConfigurationSnapshot`]
    /// and publishes it to history. Subsequent lookups observe it; prior
    /// snapshots already in history (or still referenced by a caller) are
    /// unaffected.
    pub fn create_configuration_snapshot(&self) -> Result<Arc<ConfigurationSnapshot<T>>> {
        let mut state = self.state.write();

        let mut virtual_nodes = Vec::new();
        for server in &state.servers {
            let count = state.vnode_counts[server];
            virtual_nodes.extend(vnode::place_all(self.hash_algorithm.as_ref(), server, count));
        }
        // Stable sort: ties (equal hash, different servers) keep the
        // relative order in which their servers were added.
        virtual_nodes.sort_by_key(|vn| vn.hash);

        let snapshot = Arc::new(ConfigurationSnapshot::new(
            state.servers.clone(),
            virtual_nodes,
            Arc::clone(&self.hash_algorithm),
        ));

        if (state.history.len() as u32) < self.max_history_size {
            state.history.push(Arc::clone(&snapshot));
        } else {
            match self.history_policy {
                HistoryPolicy::RemoveOldest => {
                    state.history.remove(0);
                    state.history.push(Arc::clone(&snapshot));
                }
                HistoryPolicy::ThrowError => {
                    return Err(Error::HistoryLimitExceeded {
                        max: self.max_history_size,
                        current: state.history.len() as u32,
                    });
                }
            }
        }

        tracing::debug!(
            servers = state.servers.len(),
            virtual_nodes = snapshot.virtual_nodes().len(),
            history_count = state.history.len(),
            algorithm = self.hash_algorithm.name(),
            "published configuration snapshot"
        );
        Ok(snapshot)
    }

    /// Drops all snapshots. Lookups fail with `InvalidOperation` until a new
    /// snapshot is published.
    pub fn clear_history(&self) {
        self.state.write().history.clear();
        tracing::debug!("cleared snapshot history");
    }
}

impl<T> Default for HashRing<T>
where
    T: Clone + Eq + Hash + Display + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ring_is_empty() {
        let ring: HashRing<String> = HashRing::new();
        assert!(ring.is_empty());
        assert_eq!(ring.virtual_node_count(), 0);
        assert_eq!(ring.history_count(), 0);
        assert_eq!(ring.max_history_size(), 3);
    }

    #[test]
    fn default_ring_reports_sha1_as_its_algorithm() {
        let ring: HashRing<String> = HashRing::new();
        assert_eq!(ring.hash_algorithm_name(), "SHA1");
    }

    #[test]
    fn ring_with_md5_reports_md5_as_its_algorithm() {
        let ring: HashRing<String> =
            HashRing::with_algorithm(std::sync::Arc::new(crate::hash::Md5Algorithm));
        assert_eq!(ring.hash_algorithm_name(), "MD5");
    }

    #[test]
    fn add_uses_default_vnodes() {
        let ring: HashRing<String> = HashRing::new();
        ring.add("s1".to_string(), None).unwrap();
        assert_eq!(ring.virtual_node_count(), 42);
    }

    #[test]
    fn add_replaces_not_accumulates() {
        let ring: HashRing<String> = HashRing::new();
        ring.add("s1".to_string(), Some(4)).unwrap();
        ring.add("s1".to_string(), Some(8)).unwrap();
        assert_eq!(ring.virtual_node_count(), 8);
        assert_eq!(ring.servers().len(), 1);
    }

    #[test]
    fn add_zero_vnodes_rejected() {
        let ring: HashRing<String> = HashRing::new();
        assert!(matches!(
            ring.add("s1".to_string(), Some(0)),
            Err(Error::OutOfRange(_))
        ));
        assert!(ring.is_empty());
    }

    #[test]
    fn remove_reports_presence() {
        let ring: HashRing<String> = HashRing::new();
        ring.add("s1".to_string(), Some(4)).unwrap();
        assert!(ring.remove(&"s1".to_string()));
        assert!(!ring.remove(&"s1".to_string()));
        assert!(ring.is_empty());
    }

    #[test]
    fn clear_empties_live_ring_only() {
        let ring: HashRing<String> = HashRing::new();
        ring.add("s1".to_string(), Some(4)).unwrap();
        ring.create_configuration_snapshot().unwrap();
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.history_count(), 1);
    }

    #[test]
    fn add_range_is_all_or_nothing() {
        let ring: HashRing<String> = HashRing::new();
        let result = ring.add_range(vec![
            ("s1".to_string(), 4),
            ("s2".to_string(), 0), // invalid
        ]);
        assert!(result.is_err());
        assert!(ring.is_empty(), "no partial batch should be visible");
    }

    #[test]
    fn add_range_default_applies_default_vnodes() {
        let ring: HashRing<String> = HashRing::new();
        ring.add_range_default(vec!["s1".to_string(), "s2".to_string()])
            .unwrap();
        assert_eq!(ring.servers().len(), 2);
        assert_eq!(ring.virtual_node_count(), 84);
    }

    #[test]
    fn remove_range_counts_actual_removals() {
        let ring: HashRing<String> = HashRing::new();
        ring.add("s1".to_string(), Some(4)).unwrap();
        let removed = ring.remove_range(vec!["s1".to_string(), "s2".to_string()]);
        assert_eq!(removed, 1);
    }

    #[test]
    fn history_bound_is_enforced_under_remove_oldest() {
        let ring: HashRing<String> = HashRing::new();
        ring.add("s1".to_string(), Some(4)).unwrap();
        for _ in 0..5 {
            ring.create_configuration_snapshot().unwrap();
        }
        assert_eq!(ring.history_count(), ring.max_history_size());
    }

    #[test]
    fn history_throws_when_policy_is_strict() {
        let ring: HashRing<String> = HashRing::with_options(HashRingOptions {
            max_history_size: 2,
            history_policy: HistoryPolicy::ThrowError,
            ..HashRingOptions::default()
        })
        .unwrap();
        ring.add("s1".to_string(), Some(4)).unwrap();
        ring.create_configuration_snapshot().unwrap();
        ring.create_configuration_snapshot().unwrap();
        let err = ring.create_configuration_snapshot().unwrap_err();
        assert_eq!(
            err,
            Error::HistoryLimitExceeded { max: 2, current: 2 }
        );
        assert_eq!(ring.history_count(), 2);
    }

    #[test]
    fn clear_history_removes_all_snapshots() {
        let ring: HashRing<String> = HashRing::new();
        ring.add("s1".to_string(), Some(4)).unwrap();
        ring.create_configuration_snapshot().unwrap();
        ring.clear_history();
        assert_eq!(ring.history_count(), 0);
    }
}
