//! Immutable configuration snapshots.

use std::sync::Arc;
use std::time::Instant;

use crate::hash::HashAlgorithm;
use crate::vnode::VirtualNode;

/// A frozen view of the ring's servers and virtual-node placement at the
/// moment `create_configuration_snapshot` was called.
///
/// Lookups read exclusively from snapshots, never from the live ring — this
/// decouples routing stability from ongoing mutations. A snapshot is cheap
/// to keep alive across writer churn: it's reference-counted and never
/// mutated after construction.
pub struct ConfigurationSnapshot<T> {
    servers: Vec<T>,
    virtual_nodes: Vec<VirtualNode<T>>,
    created_at: Instant,
    hash_algorithm: Arc<dyn HashAlgorithm>,
}

impl<T: Clone> ConfigurationSnapshot<T> {
    /// Builds a snapshot from already-sorted virtual nodes and the current
    /// server set. `virtual_nodes` must be ascending by `hash`; callers
    /// (the ring) are responsible for sorting before constructing.
    pub(crate) fn new(
        servers: Vec<T>,
        virtual_nodes: Vec<VirtualNode<T>>,
        hash_algorithm: Arc<dyn HashAlgorithm>,
    ) -> Self {
        debug_assert!(
            virtual_nodes.windows(2).all(|w| w[0].hash <= w[1].hash),
            "virtual_nodes must be sorted ascending by hash"
        );
        Self {
            servers,
            virtual_nodes,
            created_at: Instant::now(),
            hash_algorithm,
        }
    }

    /// Servers present in the ring when this snapshot was taken.
    pub fn servers(&self) -> &[T] {
        &self.servers
    }

    /// Virtual nodes, ascending by hash.
    pub fn virtual_nodes(&self) -> &[VirtualNode<T>] {
        &self.virtual_nodes
    }

    /// When this snapshot was created.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// The hash algorithm in effect for this snapshot.
    pub fn hash_algorithm(&self) -> &Arc<dyn HashAlgorithm> {
        &self.hash_algorithm
    }

    /// `true` if this snapshot has no virtual nodes (an empty ring was
    /// snapshotted, or every server's vnodes were removed before
    /// snapshotting).
    pub fn is_empty(&self) -> bool {
        self.virtual_nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Sha1Algorithm;

    #[test]
    fn empty_snapshot_is_legal() {
        let snap: ConfigurationSnapshot<String> =
            ConfigurationSnapshot::new(Vec::new(), Vec::new(), Arc::new(Sha1Algorithm));
        assert!(snap.is_empty());
        assert!(snap.servers().is_empty());
    }

    #[test]
    fn invariant_every_vnode_server_in_servers() {
        let servers = vec!["a".to_string(), "b".to_string()];
        let vnodes = vec![
            VirtualNode::new(1, "a".to_string()),
            VirtualNode::new(2, "b".to_string()),
        ];
        let snap = ConfigurationSnapshot::new(servers.clone(), vnodes, Arc::new(Sha1Algorithm));
        for vn in snap.virtual_nodes() {
            assert!(servers.contains(&vn.server));
        }
    }
}
