//! Virtual-node placement.
//!
//! # Virtual nodes
//!
//! Instead of giving each server a single position on the ring, every server
//! is given many (`default_virtual_nodes`, default 42) positions ("virtual
//! nodes"). This smooths load distribution and means that adding or
//! removing one server only reshuffles a fraction of the keyspace instead of
//! the whole ring.

use std::fmt::Display;

use crate::hash::{ring_position, HashAlgorithm};

/// A single position on the ring, owned by one server.
///
/// Ordered by `hash` ascending; equality is over both fields, matching the
/// source contract (two vnodes with equal hashes but different servers are
/// not the same vnode — a real but vanishingly rare possibility at `u32`
/// granularity).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualNode<T> {
    pub hash: u32,
    pub server: T,
}

impl<T> VirtualNode<T> {
    pub fn new(hash: u32, server: T) -> Self {
        Self { hash, server }
    }
}

/// Builds the `n`-th virtual node for `server`, hashing
/// `"{server}:{n}"` with `algorithm` and taking the first four bytes of the
/// digest as a big-endian `u32` ring position.
pub fn place<T: Display + Clone>(
    algorithm: &dyn HashAlgorithm,
    server: &T,
    index: u32,
) -> VirtualNode<T> {
    let key = format!("{server}:{index}");
    let digest = algorithm.compute(key.as_bytes());
    VirtualNode::new(ring_position(&digest), server.clone())
}

/// Builds `count` virtual nodes for `server`, indices `0..count`.
pub fn place_all<T: Display + Clone>(
    algorithm: &dyn HashAlgorithm,
    server: &T,
    count: u32,
) -> Vec<VirtualNode<T>> {
    (0..count).map(|i| place(algorithm, server, i)).collect()
}
