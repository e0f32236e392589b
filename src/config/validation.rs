//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use std::path::Path;
use thiserror::Error;

/// Longest SLA or dedup window accepted (ten years).
const MAX_WINDOW_SECS: u64 = 10 * 365 * 86_400;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.name is required")]
    MissingServerName,
    #[error("reports.hourly_cap must be at least 1")]
    ZeroHourlyCap,
    #[error("reports.daily_cap ({daily}) must be at least reports.hourly_cap ({hourly})")]
    DailyCapBelowHourly { hourly: u32, daily: u32 },
    #[error("{0} must be between 1 second and 10 years")]
    WindowOutOfRange(&'static str),
    #[error("appeals.max_text_len must be at least 1")]
    ZeroTextLimit,
    #[error("database.path parent directory does not exist: {0}")]
    DatabasePathInvalid(String),
}

fn window_ok(secs: u64) -> bool {
    (1..=MAX_WINDOW_SECS).contains(&secs)
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.name.trim().is_empty() {
        errors.push(ValidationError::MissingServerName);
    }

    let reports = &config.reports;
    if reports.hourly_cap == 0 {
        errors.push(ValidationError::ZeroHourlyCap);
    }
    if reports.daily_cap < reports.hourly_cap {
        errors.push(ValidationError::DailyCapBelowHourly {
            hourly: reports.hourly_cap,
            daily: reports.daily_cap,
        });
    }
    if !window_ok(reports.duplicate_window_secs) {
        errors.push(ValidationError::WindowOutOfRange(
            "reports.duplicate_window_secs",
        ));
    }

    if !window_ok(config.appeals.sla_secs) {
        errors.push(ValidationError::WindowOutOfRange("appeals.sla_secs"));
    }
    if config.appeals.max_text_len == 0 {
        errors.push(ValidationError::ZeroTextLimit);
    }

    // Database path validation
    if config.database.path != ":memory:" {
        let db_path = Path::new(&config.database.path);
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            errors.push(ValidationError::DatabasePathInvalid(
                config.database.path.clone(),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
