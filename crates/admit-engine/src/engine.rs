use std::collections::HashSet;
use std::sync::Arc;

use admit_store::{ActivateOutcome, CodeStore, CreateSummary, MarkUsedOutcome};
use admit_types::{Code, CodeRecord};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::outcome::{ActivationResult, ConfirmResult, ImportSummary, RejectReason};
use crate::status::{derive_status, PassStatus};

/// Guarded transitions and status derivation over an injected code store.
///
/// The engine holds no mutable state of its own. Any number of callers may
/// share one engine (or clones of it); correctness comes from the store's
/// per-key compare-and-set.
pub struct LifecycleEngine<S: ?Sized> {
    store: Arc<S>,
    config: EngineConfig,
}

impl<S: ?Sized> Clone for LifecycleEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S: CodeStore + ?Sized> LifecycleEngine<S> {
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Status of `record` at `now` under this engine's validity window.
    pub fn derive_status(&self, record: Option<&CodeRecord>, now: DateTime<Utc>) -> PassStatus {
        derive_status(record, now, self.config.validity_window())
    }

    /// Claim a pass. Activating twice keeps the first `activated_at`.
    pub fn activate(&self, code: &str, now: DateTime<Utc>) -> EngineResult<ActivationResult> {
        let Some(code) = normalize(code) else {
            return Ok(ActivationResult::NotFound);
        };
        let result = match self.store.try_activate(&code, now)? {
            ActivateOutcome::Activated(record) => ActivationResult::Activated(record),
            ActivateOutcome::AlreadyActivated(record) => ActivationResult::AlreadyActivated(record),
            ActivateOutcome::NotFound => ActivationResult::NotFound,
        };
        debug!(code = %code, result = result.label(), "activate");
        Ok(result)
    }

    /// Current status of a pass. Read-only.
    pub fn verify(&self, code: &str, now: DateTime<Utc>) -> EngineResult<PassStatus> {
        let Some(code) = normalize(code) else {
            return Ok(PassStatus::NotFound);
        };
        let record = self.store.get(&code)?;
        let status = self.derive_status(record.as_ref(), now);
        debug!(code = %code, %status, "verify");
        Ok(status)
    }

    /// Admit the bearer of an active pass.
    ///
    /// The status pre-check only picks the rejection reason; whether this
    /// call wins is decided by the store's compare-and-set on `used_at`. Of
    /// any number of concurrent confirmations for one code, exactly one
    /// returns `Confirmed` and the rest `Rejected(AlreadyUsed)`.
    pub fn confirm_use(&self, code: &str, now: DateTime<Utc>) -> EngineResult<ConfirmResult> {
        let Some(code) = normalize(code) else {
            return Ok(ConfirmResult::Rejected(RejectReason::NotFound));
        };

        let record = self.store.get(&code)?;
        let status = self.derive_status(record.as_ref(), now);
        if let Some(reason) = RejectReason::for_status(status) {
            debug!(code = %code, %reason, "confirm rejected before write");
            return Ok(ConfirmResult::Rejected(reason));
        }

        let result = match self.store.try_mark_used(&code, now)? {
            MarkUsedOutcome::Marked(_) => ConfirmResult::Confirmed,
            MarkUsedOutcome::AlreadyUsed(_) => {
                debug!(code = %code, "confirm lost race");
                ConfirmResult::Rejected(RejectReason::AlreadyUsed)
            }
            MarkUsedOutcome::NotFound => ConfirmResult::Rejected(RejectReason::NotFound),
        };
        debug!(code = %code, confirmed = result.is_confirmed(), "confirm");
        Ok(result)
    }

    /// Provision codes from raw lines.
    ///
    /// Lines are trimmed. A first line failing `looks_like_code` is a header
    /// and is discarded. Empty lines and repeats are dropped before the store
    /// sees the batch. Everything not created is counted in `skipped`, so
    /// `imported + skipped == lines.len()`.
    pub fn bulk_import<L, F>(&self, lines: &[L], looks_like_code: F) -> EngineResult<ImportSummary>
    where
        L: AsRef<str>,
        F: Fn(&str) -> bool,
    {
        let mut skipped = 0;
        let mut seen = HashSet::new();
        let mut unique = Vec::new();

        for (i, line) in lines.iter().enumerate() {
            let mut line = line.as_ref();
            if i == 0 {
                line = line.trim_start_matches('\u{feff}');
            }
            let line = line.trim();

            if line.is_empty() {
                skipped += 1;
                continue;
            }
            if i == 0 && !looks_like_code(line) {
                debug!(header = line, "discarding header line");
                skipped += 1;
                continue;
            }
            if !seen.insert(line) {
                skipped += 1;
                continue;
            }
            unique.push(line.to_string());
        }

        let stored = if unique.is_empty() {
            CreateSummary::default()
        } else {
            self.store.try_create_many(&unique)?
        };

        let summary = ImportSummary {
            imported: stored.created,
            skipped: skipped + stored.skipped,
        };
        debug!(
            lines = lines.len(),
            imported = summary.imported,
            skipped = summary.skipped,
            "bulk import"
        );
        Ok(summary)
    }
}

fn normalize(raw: &str) -> Option<Code> {
    match Code::parse(raw) {
        Ok(code) => Some(code),
        Err(e) => {
            debug!(error = %e, "unusable code treated as not found");
            None
        }
    }
}
