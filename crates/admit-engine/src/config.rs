use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Default validity window: 15 minutes.
pub const DEFAULT_VALIDITY_WINDOW_SECS: u64 = 15 * 60;

/// Configuration for the lifecycle engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How long an activated pass stays admissible, in seconds.
    pub validity_window_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            validity_window_secs: DEFAULT_VALIDITY_WINDOW_SECS,
        }
    }
}

impl EngineConfig {
    /// The validity window as a duration.
    pub fn validity_window(&self) -> Duration {
        let secs = i64::try_from(self.validity_window_secs).unwrap_or(i64::MAX);
        Duration::try_seconds(secs).unwrap_or(Duration::MAX)
    }
}
