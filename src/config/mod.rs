//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, ServerConfig, DatabaseConfig)
//! - [`policy`]: Moderation policy knobs (ReportPolicy, AppealPolicy)
//! - [`validation`]: Startup validation collecting every error found
//! - [`defaults`]: Serde default value functions

mod defaults;
mod policy;
mod types;
mod validation;

pub use policy::{AppealPolicy, ReportPolicy};
pub use types::{Config, ConfigError, DatabaseConfig, ServerConfig};
pub use validation::{ValidationError, validate};
