//! Consistent hash ring: live mutable membership plus snapshot-only lookups.

pub(crate) mod core;
mod lookup;

pub use self::core::HashRing;
