//! Ring construction options.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::hash::{HashAlgorithm, Sha1Algorithm};

/// Eviction policy applied by `create_configuration_snapshot` when history
/// is already at `max_history_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryPolicy {
    /// Drop the oldest snapshot to make room for the new one (FIFO).
    #[default]
    RemoveOldest,
    /// Fail the snapshot attempt with [`Error::HistoryLimitExceeded`] and
    /// leave history untouched.
    ThrowError,
}

/// Construction-time options for [`crate::HashRing`].
#[derive(Clone)]
pub struct HashRingOptions {
    pub default_virtual_nodes: u32,
    pub max_history_size: u32,
    pub history_policy: HistoryPolicy,
    pub hash_algorithm: Arc<dyn HashAlgorithm>,
}

impl Default for HashRingOptions {
    fn default() -> Self {
        Self {
            default_virtual_nodes: 42,
            max_history_size: 3,
            history_policy: HistoryPolicy::default(),
            hash_algorithm: Arc::new(Sha1Algorithm),
        }
    }
}

impl HashRingOptions {
    /// Confirms `default_virtual_nodes` and `max_history_size` are both
    /// positive, per the data model's "positive integer" invariants.
    pub fn validate(&self) -> Result<()> {
        if self.default_virtual_nodes == 0 {
            return Err(Error::OutOfRange(
                "default_virtual_nodes must be >= 1".to_string(),
            ));
        }
        if self.max_history_size == 0 {
            return Err(Error::OutOfRange(
                "max_history_size must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let opts = HashRingOptions::default();
        assert_eq!(opts.default_virtual_nodes, 42);
        assert_eq!(opts.max_history_size, 3);
        assert_eq!(opts.history_policy, HistoryPolicy::RemoveOldest);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn zero_vnodes_rejected() {
        let mut opts = HashRingOptions::default();
        opts.default_virtual_nodes = 0;
        assert!(matches!(opts.validate(), Err(Error::OutOfRange(_))));
    }

    #[test]
    fn zero_history_rejected() {
        let mut opts = HashRingOptions::default();
        opts.max_history_size = 0;
        assert!(matches!(opts.validate(), Err(Error::OutOfRange(_))));
    }
}
