use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("code is empty after trimming")]
    Empty,

    #[error("code too long: {len} bytes (max {max})")]
    TooLong { len: usize, max: usize },
}
