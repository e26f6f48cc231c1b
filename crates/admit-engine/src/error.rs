use admit_store::StoreError;

/// Errors from engine operations.
///
/// "Not found" and every rejection are result values, not errors. The only
/// failure is the store not completing a call, in which case no transition
/// happened and the call is safe to retry.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        tracing::warn!(error = %err, "code store call failed");
        Self::StorageUnavailable(err.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
