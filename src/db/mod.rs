//! Database module for persistent storage.
//!
//! Provides async SQLite access using SQLx for:
//! - abuse reports and their triage state
//! - moderation actions, community bans and platform suspensions
//! - appeals and the audit trail
//! - reporter reputation and the content directory mirror
//!
//! Engine code never touches the pool directly. It opens a [`SqliteTx`]
//! through [`Store::begin`] and talks to the storage ports in [`ports`].

mod appeals;
mod audit;
mod content;
pub mod ports;
mod reports;
mod rows;
mod sanctions;

pub use content::ContentRepository;
pub use ports::{
    AppealDecisionRecord, AppealLedger, AuditEntry, AuditTrail, ContentDirectory, ContentInfo,
    ReportCounts, ReportLog, SanctionRegistry, Store, StoreTx,
};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

static MEMDB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(sqlx::Error),
    #[error("migration error: {0}")]
    Migration(sqlx::migrate::MigrateError),
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("store busy after {0} attempts")]
    Busy(u32),
}

/// Database handle with connection pool.
///
/// Cloning is cheap; clones share the pool and the write gate.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    /// Held for the lifetime of every [`SqliteTx`]. Serialises
    /// check-then-write sequences so counts and existence checks cannot
    /// race with a concurrent insert.
    write_gate: Arc<Mutex<()>>,
}

impl Database {
    /// Connection acquire timeout - prevents connection storms from blocking indefinitely.
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Maximum time a connection can remain idle before being closed.
    const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Attempts made by [`Store::begin`] before reporting the store unavailable.
    const BEGIN_ATTEMPTS: u32 = 3;

    /// Base delay between `begin` attempts (multiplied by the attempt number).
    const RETRY_BACKOFF: Duration = Duration::from_millis(50);

    /// Create a new database connection, running migrations if needed.
    pub async fn new(path: &str) -> Result<Self, DbError> {
        let pool = if path == ":memory:" {
            // Uniquely named shared-cache memory database per call.
            // `file::memory:` is global-ish and would collide across parallel tests.
            let id = MEMDB_COUNTER.fetch_add(1, Ordering::Relaxed);
            let memdb_uri = format!(
                "file:sanctiond-memdb-{}-{}?mode=memory&cache=shared",
                std::process::id(),
                id
            );

            let options = SqliteConnectOptions::new()
                .filename(&memdb_uri)
                .shared_cache(true)
                .create_if_missing(true)
                .foreign_keys(true);

            SqlitePoolOptions::new()
                .max_connections(1)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .idle_timeout(Some(Self::IDLE_TIMEOUT))
                .test_before_acquire(true)
                .connect_with(options)
                .await?
        } else {
            if let Some(parent) = Path::new(path).parent()
                && !parent.as_os_str().is_empty()
                && let Err(e) = std::fs::create_dir_all(parent)
            {
                warn!(path = %parent.display(), error = %e, "Failed to create database directory");
            }

            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .foreign_keys(true);

            SqlitePoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .idle_timeout(Some(Self::IDLE_TIMEOUT))
                .test_before_acquire(true)
                .connect_with(options)
                .await?
        };

        info!(path = %path, "Database connected");

        Self::run_migrations(&pool).await?;

        // WAL lets readers proceed while the single writer holds the gate.
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA synchronous=NORMAL")
            .execute(&pool)
            .await?;

        let integrity_result: String = sqlx::query_scalar("PRAGMA integrity_check")
            .fetch_one(&pool)
            .await?;

        if integrity_result != "ok" {
            tracing::error!(
                integrity_check = %integrity_result,
                "Database integrity check FAILED - corruption detected!"
            );
            return Err(DbError::Corrupt(format!(
                "integrity check failed: {}",
                integrity_result
            )));
        }

        info!("Database integrity check passed");

        Ok(Self {
            pool,
            write_gate: Arc::new(Mutex::new(())),
        })
    }

    /// Get reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run embedded migrations.
    async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(DbError::Migration)?;

        info!("Database migrations checked/applied");
        Ok(())
    }

    /// Get the content directory repository (host application sync).
    pub fn content(&self) -> ContentRepository<'_> {
        ContentRepository::new(&self.pool)
    }
}

/// Whether a failure to open a transaction is worth retrying.
fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut => true,
        // SQLITE_BUSY (5) / SQLITE_LOCKED (6)
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|c| c == "5" || c == "6"),
        _ => false,
    }
}

#[async_trait]
impl Store for Database {
    type Tx = SqliteTx;

    async fn begin(&self) -> Result<SqliteTx, DbError> {
        let gate = Arc::clone(&self.write_gate).lock_owned().await;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.pool.begin().await {
                Ok(tx) => return Ok(SqliteTx { tx, _gate: gate }),
                Err(e) if is_transient(&e) && attempt < Self::BEGIN_ATTEMPTS => {
                    warn!(attempt, error = %e, "Store busy, retrying transaction start");
                    tokio::time::sleep(Self::RETRY_BACKOFF * attempt).await;
                }
                Err(e) if is_transient(&e) => return Err(DbError::Busy(attempt)),
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// An open SQLite transaction implementing every storage port.
///
/// Dropping it without [`StoreTx::commit`] rolls back.
pub struct SqliteTx {
    tx: Transaction<'static, Sqlite>,
    _gate: OwnedMutexGuard<()>,
}

#[async_trait]
impl StoreTx for SqliteTx {
    async fn commit(self) -> Result<(), DbError> {
        let SqliteTx { tx, _gate } = self;
        tx.commit().await?;
        Ok(())
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        DbError::Sqlx(err)
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::Migration(err)
    }
}

/// Map a UNIQUE violation to [`DbError::UniqueViolation`], anything else to `Sqlx`.
pub(crate) fn unique_or(err: sqlx::Error, what: &str) -> DbError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return DbError::UniqueViolation(what.to_string());
    }
    DbError::from(err)
}
