//! Moderation policy: report caps and appeal deadlines.

use super::defaults::*;
use chrono::Duration;
use serde::Deserialize;

/// Report intake limits.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportPolicy {
    /// Maximum reports per reporter in the trailing hour (default: 10).
    #[serde(default = "default_hourly_cap")]
    pub hourly_cap: u32,

    /// Maximum reports per reporter in the trailing 24 hours (default: 50).
    #[serde(default = "default_daily_cap")]
    pub daily_cap: u32,

    /// Seconds during which a reporter may not re-report the same target (default: 86400).
    #[serde(default = "default_duplicate_window_secs")]
    pub duplicate_window_secs: u64,

    /// Minimum trimmed explanation length for category `other` (default: 20).
    #[serde(default = "default_other_min_explanation")]
    pub other_min_explanation: usize,

    /// Reporters with a trust score below this are refused (default: 0).
    #[serde(default = "default_min_reporter_trust")]
    pub min_reporter_trust: i32,
}

impl Default for ReportPolicy {
    fn default() -> Self {
        Self {
            hourly_cap: default_hourly_cap(),
            daily_cap: default_daily_cap(),
            duplicate_window_secs: default_duplicate_window_secs(),
            other_min_explanation: default_other_min_explanation(),
            min_reporter_trust: default_min_reporter_trust(),
        }
    }
}

impl ReportPolicy {
    pub fn duplicate_window(&self) -> Duration {
        secs(self.duplicate_window_secs)
    }
}

/// Appeal submission settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AppealPolicy {
    /// Offset of `expected_resolution_at` from submission (default: 7 days).
    #[serde(default = "default_sla_secs")]
    pub sla_secs: u64,

    /// Upper bound on appeal and decision text, in characters (default: 5000).
    #[serde(default = "default_max_text_len")]
    pub max_text_len: usize,
}

impl Default for AppealPolicy {
    fn default() -> Self {
        Self {
            sla_secs: default_sla_secs(),
            max_text_len: default_max_text_len(),
        }
    }
}

impl AppealPolicy {
    pub fn sla(&self) -> Duration {
        secs(self.sla_secs)
    }
}

fn secs(value: u64) -> Duration {
    Duration::seconds(i64::try_from(value).unwrap_or(i64::MAX / 1000))
}
