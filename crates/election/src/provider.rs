//! Construction entry point for [`crate::LeaderElectionService`].

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::options::RedisLeaderElectionOptions;
use crate::service::LeaderElectionService;

/// Builds [`LeaderElectionService`] instances, validating options once at
/// construction time rather than leaving callers to discover a bad
/// `key_prefix` on the first failed store call.
pub struct ElectionProvider;

impl ElectionProvider {
    /// Validates `options`, then constructs a service for `election_name`/
    /// `participant_id`. Fails with [`Error::InvalidArgument`] for an empty
    /// name or participant id, or with [`Error::ValidationError`] if
    /// `options` itself is invalid.
    pub fn create(
        election_name: impl Into<String>,
        participant_id: impl Into<String>,
        options: RedisLeaderElectionOptions,
    ) -> Result<Arc<LeaderElectionService>> {
        let options = options.validate()?;
        LeaderElectionService::new(election_name, participant_id, options)
    }
}
