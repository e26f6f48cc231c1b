//! The record index shared by every backend.
//!
//! Each conditional write checks its precondition, hands the resulting
//! [`Mutation`]s to a `commit` callback, and only then updates the index.
//! The in-memory backend commits to nothing; the WAL backend appends to its
//! log. If `commit` fails the index is left exactly as it was.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use admit_types::{Code, CodeRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::traits::{ActivateOutcome, CreateSummary, MarkUsedOutcome};

/// A single state change to one record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
    Create { code: Code },
    Activate { code: Code, at: DateTime<Utc> },
    MarkUsed { code: Code, at: DateTime<Utc> },
}

#[derive(Debug, Default)]
pub(crate) struct RecordIndex {
    records: HashMap<Code, CodeRecord>,
}

impl RecordIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, code: &Code) -> Option<&CodeRecord> {
        self.records.get(code)
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    /// Apply a mutation if its precondition holds. Returns `true` if the
    /// index changed. Used for log replay, where a repeated entry is harmless.
    pub(crate) fn apply(&mut self, mutation: Mutation) -> bool {
        match mutation {
            Mutation::Create { code } => match self.records.entry(code) {
                Entry::Vacant(slot) => {
                    let code = slot.key().clone();
                    slot.insert(CodeRecord::new(code));
                    true
                }
                Entry::Occupied(_) => false,
            },
            Mutation::Activate { code, at } => match self.records.get_mut(&code) {
                Some(record) if !record.is_activated() => {
                    record.activated_at = Some(at);
                    true
                }
                _ => false,
            },
            Mutation::MarkUsed { code, at } => match self.records.get_mut(&code) {
                Some(record) if !record.is_used() => {
                    record.used_at = Some(at);
                    true
                }
                _ => false,
            },
        }
    }

    pub(crate) fn try_create_many<F>(
        &mut self,
        codes: &[String],
        commit: F,
    ) -> StoreResult<CreateSummary>
    where
        F: FnOnce(&[Mutation]) -> StoreResult<()>,
    {
        let mut seen = HashSet::new();
        let mut planned = Vec::new();
        let mut skipped = 0;

        for raw in codes {
            match Code::parse(raw) {
                Ok(code) if !self.records.contains_key(&code) && seen.insert(code.clone()) => {
                    planned.push(Mutation::Create { code });
                }
                _ => skipped += 1,
            }
        }

        if !planned.is_empty() {
            commit(&planned)?;
        }

        let created = planned.len();
        for mutation in planned {
            self.apply(mutation);
        }
        Ok(CreateSummary { created, skipped })
    }

    pub(crate) fn try_activate<F>(
        &mut self,
        code: &Code,
        now: DateTime<Utc>,
        commit: F,
    ) -> StoreResult<ActivateOutcome>
    where
        F: FnOnce(&[Mutation]) -> StoreResult<()>,
    {
        let Some(record) = self.records.get_mut(code) else {
            return Ok(ActivateOutcome::NotFound);
        };
        if record.is_activated() {
            return Ok(ActivateOutcome::AlreadyActivated(record.clone()));
        }

        commit(&[Mutation::Activate {
            code: code.clone(),
            at: now,
        }])?;
        record.activated_at = Some(now);
        Ok(ActivateOutcome::Activated(record.clone()))
    }

    pub(crate) fn try_mark_used<F>(
        &mut self,
        code: &Code,
        now: DateTime<Utc>,
        commit: F,
    ) -> StoreResult<MarkUsedOutcome>
    where
        F: FnOnce(&[Mutation]) -> StoreResult<()>,
    {
        let Some(record) = self.records.get_mut(code) else {
            return Ok(MarkUsedOutcome::NotFound);
        };
        if record.is_used() {
            return Ok(MarkUsedOutcome::AlreadyUsed(record.clone()));
        }

        commit(&[Mutation::MarkUsed {
            code: code.clone(),
            at: now,
        }])?;
        record.used_at = Some(now);
        Ok(MarkUsedOutcome::Marked(record.clone()))
    }
}
