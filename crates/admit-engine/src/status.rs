use std::fmt;

use admit_types::CodeRecord;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Externally visible status of a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassStatus {
    NotFound,
    Unused,
    Active,
    Expired,
    Used,
}

impl fmt::Display for PassStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotFound => "not_found",
            Self::Unused => "unused",
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Used => "used",
        };
        f.write_str(s)
    }
}

/// Derive a pass's status from its record and the current time.
///
/// First match wins:
/// 1. no record: `NotFound`
/// 2. `used_at` set: `Used`
/// 3. `activated_at` unset: `Unused`
/// 4. `now - activated_at >= window`: `Expired`
/// 5. otherwise `Active`
///
/// `Used` therefore dominates `Expired`, and a check exactly at the end of
/// the window is already `Expired`.
pub fn derive_status(record: Option<&CodeRecord>, now: DateTime<Utc>, window: Duration) -> PassStatus {
    let Some(record) = record else {
        return PassStatus::NotFound;
    };
    if record.is_used() {
        return PassStatus::Used;
    }
    match record.activated_at {
        None => PassStatus::Unused,
        Some(activated_at) if now - activated_at >= window => PassStatus::Expired,
        Some(_) => PassStatus::Active,
    }
}
