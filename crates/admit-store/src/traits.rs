use admit_types::{Code, CodeRecord};
use chrono::{DateTime, Utc};

use crate::error::StoreResult;

/// Counts reported by [`CodeStore::try_create_many`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CreateSummary {
    pub created: usize,
    pub skipped: usize,
}

/// Result of [`CodeStore::try_activate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActivateOutcome {
    /// This call set `activated_at`.
    Activated(CodeRecord),
    /// `activated_at` was already set; the existing record is returned unchanged.
    AlreadyActivated(CodeRecord),
    NotFound,
}

/// Result of [`CodeStore::try_mark_used`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarkUsedOutcome {
    /// This call set `used_at`.
    Marked(CodeRecord),
    /// `used_at` was already set; the existing record is returned unchanged.
    AlreadyUsed(CodeRecord),
    NotFound,
}

/// Keyed storage for pass records.
///
/// All implementations must satisfy these invariants:
/// - `try_activate` and `try_mark_used` act as one atomic compare-and-set on
///   their field. Of N callers racing on the same code, exactly one observes
///   the transition and the rest observe the already-done outcome.
/// - A key is created at most once; duplicates are skipped, never overwritten.
/// - Reads never observe a partially written record.
/// - An `Err` return means the write did not take effect.
pub trait CodeStore: Send + Sync {
    /// Read a record by code.
    ///
    /// Returns `Ok(None)` if no record exists.
    fn get(&self, code: &Code) -> StoreResult<Option<CodeRecord>>;

    /// Create blank records for every input key that does not exist yet.
    ///
    /// Keys are trimmed before use. Keys that are empty after trimming,
    /// invalid, already stored, or repeated within `codes` are skipped.
    /// Each key is created atomically; the batch as a whole is not.
    fn try_create_many(&self, codes: &[String]) -> StoreResult<CreateSummary>;

    /// Set `activated_at = now` if the record exists and is not yet activated.
    fn try_activate(&self, code: &Code, now: DateTime<Utc>) -> StoreResult<ActivateOutcome>;

    /// Set `used_at = now` if the record exists and is not yet used.
    fn try_mark_used(&self, code: &Code, now: DateTime<Utc>) -> StoreResult<MarkUsedOutcome>;

    /// Number of stored records.
    fn count(&self) -> StoreResult<usize>;
}
