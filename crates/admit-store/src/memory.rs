use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use admit_types::{Code, CodeRecord};
use chrono::{DateTime, Utc};

use crate::error::{StoreError, StoreResult};
use crate::index::{Mutation, RecordIndex};
use crate::traits::{ActivateOutcome, CodeStore, CreateSummary, MarkUsedOutcome};

fn no_log(_: &[Mutation]) -> StoreResult<()> {
    Ok(())
}

/// In-memory, HashMap-based code store.
///
/// Intended for tests and embedding. Records are held behind a `RwLock`:
/// every conditional write holds the write lock across its check and its
/// update, so it is a true compare-and-set. Records are cloned on read.
pub struct InMemoryCodeStore {
    index: RwLock<RecordIndex>,
}

impl InMemoryCodeStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            index: RwLock::new(RecordIndex::new()),
        }
    }

    /// Create a store pre-populated with blank records for `codes`.
    pub fn with_codes<I, S>(codes: I) -> StoreResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        let codes: Vec<String> = codes.into_iter().map(Into::into).collect();
        store.try_create_many(&codes)?;
        Ok(store)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, RecordIndex>> {
        self.index.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, RecordIndex>> {
        self.index.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl Default for InMemoryCodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeStore for InMemoryCodeStore {
    fn get(&self, code: &Code) -> StoreResult<Option<CodeRecord>> {
        Ok(self.read()?.get(code).cloned())
    }

    fn try_create_many(&self, codes: &[String]) -> StoreResult<CreateSummary> {
        self.write()?.try_create_many(codes, no_log)
    }

    fn try_activate(&self, code: &Code, now: DateTime<Utc>) -> StoreResult<ActivateOutcome> {
        self.write()?.try_activate(code, now, no_log)
    }

    fn try_mark_used(&self, code: &Code, now: DateTime<Utc>) -> StoreResult<MarkUsedOutcome> {
        self.write()?.try_mark_used(code, now, no_log)
    }

    fn count(&self) -> StoreResult<usize> {
        Ok(self.read()?.len())
    }
}

impl std::fmt::Debug for InMemoryCodeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.count().unwrap_or_default();
        f.debug_struct("InMemoryCodeStore")
            .field("record_count", &count)
            .finish()
    }
}
