//! Markwatch Cache - Local state persistence
//!
//! Storage adapters for:
//! - The structured store (bookmarks, history, last sync time, interval, theme)
//! - The key-value store holding the preferred copy of the bookmark snapshot
//!
//! ## Architecture
//!
//! This crate implements the `IStructuredStore` and `IKeyValueStore` ports
//! from `markwatch-core`. It is a driven (secondary) adapter in the
//! hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with migration support
//! - [`SqliteStructuredStore`] - SQLite `IStructuredStore` with change notifications
//! - [`FileKeyValueStore`] - One JSON document per key, written atomically
//! - [`CacheError`] - Error types for cache operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use markwatch_cache::{DatabasePool, FileKeyValueStore, SqliteStructuredStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/home/user/.local/share/markwatch/markwatch.db")).await?;
//! let store = SqliteStructuredStore::new(pool.pool().clone());
//! let kv = FileKeyValueStore::new("/home/user/.local/share/markwatch/kv");
//! # Ok(())
//! # }
//! ```

pub mod kv;
pub mod pool;
pub mod structured;

pub use kv::FileKeyValueStore;
pub use pool::DatabasePool;
pub use structured::SqliteStructuredStore;

/// Errors that can occur during cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A key-value key cannot be mapped to a file name
    #[error("Invalid key: {0:?}")]
    InvalidKey(String),

    /// Filesystem access failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::QueryFailed(e.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::SerializationError(e.to_string())
    }
}
