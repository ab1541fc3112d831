//! SQLite pool behind the structured store
//!
//! The structured store is a handful of `settings` rows rewritten after each
//! refresh that found changes and read once at start-up. A file database
//! therefore needs only a few connections; WAL lets the daemon's readers run
//! while a refresh commits. The schema is applied every time a pool opens and
//! is written to be re-runnable.

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::CacheError;

/// Connections kept for a file database
const FILE_POOL_CONNECTIONS: u32 = 4;

/// How long a writer waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings table schema
const SCHEMA: &str = include_str!("migrations/20260301_initial.sql");

/// Connection pool for the `settings` table
#[derive(Clone)]
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Opens (creating if needed) the settings database at `db_path`
    ///
    /// Missing parent directories are created first, so a fresh data
    /// directory needs no setup.
    ///
    /// # Errors
    ///
    /// `CacheError::ConnectionFailed` if the directory or database cannot be
    /// opened, `CacheError::MigrationFailed` if the schema cannot be applied.
    pub async fn new(db_path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                CacheError::ConnectionFailed(format!(
                    "Cannot create settings directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(FILE_POOL_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|e| {
                CacheError::ConnectionFailed(format!(
                    "Cannot open settings database {}: {}",
                    db_path.display(),
                    e
                ))
            })?;

        apply_schema(&pool).await?;
        tracing::info!(path = %db_path.display(), "Settings database opened");

        Ok(Self { pool })
    }

    /// Opens a throwaway settings database held in memory
    ///
    /// An in-memory SQLite database lives inside one connection, so the pool
    /// is capped at a single connection.
    pub async fn in_memory() -> Result<Self, CacheError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                CacheError::ConnectionFailed(format!("Cannot open in-memory settings: {}", e))
            })?;

        apply_schema(&pool).await?;
        tracing::debug!("In-memory settings database opened");

        Ok(Self { pool })
    }

    /// Returns the underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), CacheError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| CacheError::MigrationFailed(format!("Cannot create settings table: {}", e)))?;
    Ok(())
}
