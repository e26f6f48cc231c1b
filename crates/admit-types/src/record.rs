use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::code::Code;

/// Stored state of a single admission pass.
///
/// Both timestamps are set at most once. Ordering between them is not
/// enforced here; callers that need "activated before used" check it before
/// asking the store to write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeRecord {
    pub code: Code,
    pub activated_at: Option<DateTime<Utc>>,
    pub used_at: Option<DateTime<Utc>>,
}

impl CodeRecord {
    /// A freshly provisioned record: neither activated nor used.
    pub fn new(code: Code) -> Self {
        Self {
            code,
            activated_at: None,
            used_at: None,
        }
    }

    pub fn is_activated(&self) -> bool {
        self.activated_at.is_some()
    }

    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }
}
