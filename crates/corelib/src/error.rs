//! Error types for the core library.

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while mutating or querying a [`crate::HashRing`].
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A required argument was absent (a collection or one of its elements).
    #[error("null argument: {0}")]
    NullArgument(&'static str),

    /// A numeric argument fell outside its legal range (e.g. a zero vnode count).
    #[error("value out of range: {0}")]
    OutOfRange(String),

    /// The ring was asked to do something it currently cannot, most commonly
    /// a lookup against a ring with no published snapshots.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// `create_configuration_snapshot` was called under `HistoryPolicy::ThrowError`
    /// with history already at `max_history_size`. History is left unchanged.
    #[error("history limit exceeded: max={max}, current={current}")]
    HistoryLimitExceeded { max: u32, current: u32 },
}

impl Error {
    /// `true` for the [`Error::HistoryLimitExceeded`] variant, which is a
    /// specialization of "invalid operation" that callers may want to match
    /// generically alongside `Error::InvalidOperation`.
    pub fn is_history_limit_exceeded(&self) -> bool {
        matches!(self, Error::HistoryLimitExceeded { .. })
    }
}
