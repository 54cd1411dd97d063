//! Error types for the leader election crate.

/// Result type alias for the election crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while acquiring, renewing, or holding a lease, or
/// while driving a [`crate::LeaderElectionService`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An election name or participant id was empty.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// [`crate::RedisLeaderElectionOptions::validate`] rejected the options.
    #[error("validation failed: {0}")]
    ValidationError(String),

    /// An operation was attempted on a disposed lease store or election
    /// service.
    #[error("object disposed")]
    ObjectDisposed,

    /// The underlying key-value store returned a transport, timeout, or
    /// server-side script error. Surfaced unchanged from acquire/renew/get/
    /// has; swallowed to `false` by `release_lease`.
    #[error("store transport error: {0}")]
    Transport(#[from] redis::RedisError),

    /// A lease record failed to serialize or deserialize.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A store call did not complete within `operation_timeout`.
    #[error("operation timed out after {0:?}")]
    OperationTimedOut(std::time::Duration),
}
