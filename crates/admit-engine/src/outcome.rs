use std::fmt;

use admit_types::CodeRecord;
use serde::{Deserialize, Serialize};

use crate::status::PassStatus;

/// Result of [`LifecycleEngine::activate`](crate::LifecycleEngine::activate).
///
/// `Activated` and `AlreadyActivated` are both success for the guest; they
/// differ only in whether this call caused the transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActivationResult {
    Activated(CodeRecord),
    AlreadyActivated(CodeRecord),
    NotFound,
}

impl ActivationResult {
    /// The stored record, if the code exists.
    pub fn record(&self) -> Option<&CodeRecord> {
        match self {
            Self::Activated(r) | Self::AlreadyActivated(r) => Some(r),
            Self::NotFound => None,
        }
    }

    /// Wire label: `activated`, `already_activated` or `not_found`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Activated(_) => "activated",
            Self::AlreadyActivated(_) => "already_activated",
            Self::NotFound => "not_found",
        }
    }
}

/// Why a confirmation was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    AlreadyUsed,
    NotActivated,
    Expired,
    NotFound,
}

impl RejectReason {
    /// The rejection for a non-admissible status, or `None` for `Active`.
    pub fn for_status(status: PassStatus) -> Option<Self> {
        match status {
            PassStatus::Active => None,
            PassStatus::Used => Some(Self::AlreadyUsed),
            PassStatus::Unused => Some(Self::NotActivated),
            PassStatus::Expired => Some(Self::Expired),
            PassStatus::NotFound => Some(Self::NotFound),
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AlreadyUsed => "already_used",
            Self::NotActivated => "not_activated",
            Self::Expired => "expired",
            Self::NotFound => "not_found",
        };
        f.write_str(s)
    }
}

/// Result of [`LifecycleEngine::confirm_use`](crate::LifecycleEngine::confirm_use).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmResult {
    Confirmed,
    Rejected(RejectReason),
}

impl ConfirmResult {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed)
    }
}

/// Counts reported by [`LifecycleEngine::bulk_import`](crate::LifecycleEngine::bulk_import).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}
