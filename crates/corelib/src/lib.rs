//! Core library: a generic consistent hash ring with versioned configuration
//! snapshots.
//!
//! - [`HashRing`] — live, mutable server membership and virtual-node
//!   placement.
//! - [`ConfigurationSnapshot`] — an immutable, reference-counted frozen view
//!   of the ring, used exclusively for lookups.
//! - [`HashAlgorithm`] — the hashing strategy (SHA-1, MD5, or a custom
//!   implementation) used to place virtual nodes and locate keys.
//! - [`HashKey`] — deterministic byte encodings for the key types callers
//!   typically have on hand (`&str`, `String`, `u32`, `i32`, `i64`, `Uuid`,
//!   raw bytes).

#![forbid(unsafe_code)]

pub mod error;
pub mod hash;
pub mod key;
pub mod options;
pub mod ring;
pub mod snapshot;
pub mod vnode;

pub use error::{Error, Result};
pub use hash::{HashAlgorithm, Md5Algorithm, Sha1Algorithm};
pub use key::HashKey;
pub use options::{HashRingOptions, HistoryPolicy};
pub use ring::HashRing;
pub use snapshot::ConfigurationSnapshot;
pub use vnode::VirtualNode;
