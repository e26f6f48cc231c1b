/// Errors from code store operations.
///
/// None of these mean "not found": absence is reported through the outcome
/// types in [`crate::traits`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not complete the call.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The write-ahead log is damaged somewhere other than its tail.
    #[error("corrupt log at byte {offset}: {reason}")]
    Corrupt { offset: u64, reason: String },

    /// A thread panicked while holding the record lock.
    #[error("record lock poisoned")]
    LockPoisoned,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
