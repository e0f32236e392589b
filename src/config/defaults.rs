//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

use std::net::SocketAddr;

// =============================================================================
// Server Defaults
// =============================================================================

pub fn default_server_name() -> String {
    "sanctiond".to_string()
}

pub fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

pub fn default_database_path() -> String {
    "data/sanctiond.db".to_string()
}

// =============================================================================
// Report Intake Defaults
// =============================================================================

pub fn default_hourly_cap() -> u32 {
    10
}

pub fn default_daily_cap() -> u32 {
    50
}

/// 24 hours.
pub fn default_duplicate_window_secs() -> u64 {
    86_400
}

pub fn default_other_min_explanation() -> usize {
    20
}

pub fn default_min_reporter_trust() -> i32 {
    0
}

// =============================================================================
// Appeal Defaults
// =============================================================================

/// 7 days.
pub fn default_sla_secs() -> u64 {
    604_800
}

pub fn default_max_text_len() -> usize {
    5000
}
