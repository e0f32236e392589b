//! Core configuration types and loading.

use super::defaults::*;
use super::policy::{AppealPolicy, ReportPolicy};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Daemon configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server identity and listener.
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Report intake limits.
    #[serde(default)]
    pub reports: ReportPolicy,
    /// Appeal deadlines and bounds.
    #[serde(default)]
    pub appeals: AppealPolicy,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Name reported in logs and the startup banner.
    #[serde(default = "default_server_name")]
    pub name: String,
    /// HTTP listen address for the API and `/metrics`.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file, or `:memory:`.
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn minimal_config_uses_defaults() {
        let config: Config = toml::from_str("[server]\n").unwrap();
        assert_eq!(config.server.name, "sanctiond");
        assert_eq!(config.server.listen.port(), 8080);
        assert_eq!(config.database.path, "data/sanctiond.db");
        assert_eq!(config.reports.daily_cap, 50);
        assert_eq!(config.appeals.sla_secs, 604_800);
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
name = "mod.example"
listen = "0.0.0.0:9000"

[database]
path = ":memory:"

[reports]
hourly_cap = 5
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.name, "mod.example");
        assert_eq!(config.server.listen.port(), 9000);
        assert_eq!(config.database.path, ":memory:");
        assert_eq!(config.reports.hourly_cap, 5);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Config::load("/nonexistent/sanctiond.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
