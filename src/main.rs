//! sanctiond - moderation, sanction and appeal lifecycle engine.

use sanctiond::config::{self, Config};
use sanctiond::db::Database;
use sanctiond::moderation::Engine;
use sanctiond::security::ReputationManager;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = config::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("{} configuration error(s) in {config_path}", errors.len());
    }

    info!(
        server = %config.server.name,
        listen = %config.server.listen,
        "Starting sanctiond"
    );

    sanctiond::metrics::init();

    let db = Database::new(&config.database.path).await?;
    info!(path = %config.database.path, "Database ready");

    let reputation = ReputationManager::new(db.pool().clone());
    let engine = Arc::new(Engine::new(
        db,
        Arc::new(reputation),
        config.reports.clone(),
        config.appeals.clone(),
    ));

    tokio::select! {
        result = sanctiond::http::run_http_server(config.server.listen, engine) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested");
        }
    }

    Ok(())
}
