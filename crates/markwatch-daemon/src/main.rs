//! Markwatch Daemon - Background bookmark change detection
//!
//! This binary runs as a user service and handles:
//! - Loading the bookmark baseline (or taking the first snapshot)
//! - Periodic refreshes at the stored sync interval
//! - Debounced refreshes after the bookmarks file changes
//! - Reconfiguring the interval when another writer changes it
//! - Graceful shutdown on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! The daemon opens the two persistent stores, wires them into a
//! `RefreshEngine`, and hands the engine to a `SyncScheduler` running on its
//! own task. The scheduler handle is registered as observer of both the
//! structured store and the bookmarks file. The main task then waits on a
//! `CancellationToken` that is triggered on receipt of SIGTERM or SIGINT.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use markwatch_cache::{DatabasePool, FileKeyValueStore, SqliteStructuredStore};
use markwatch_core::{
    config::Config,
    domain::SystemClock,
    ports::{ITreeProvider, WatchHandle},
};
use markwatch_sync::{
    engine::{RefreshEngine, Refresher},
    history::HistoryLog,
    provider::BookmarkFileProvider,
    scheduler::{init_sync_settings, SyncScheduler},
    snapshot::SnapshotCache,
    storage::StorageService,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// ============================================================================
// DaemonService
// ============================================================================

/// Main daemon service that wires the engine to its stores and triggers
struct DaemonService {
    /// Application configuration loaded from YAML
    config: Config,
    /// Typed view of the structured store
    storage: StorageService,
    /// Source of bookmark trees
    provider: Arc<BookmarkFileProvider>,
    /// Refresh coordinator shared with the scheduler
    engine: Arc<RefreshEngine>,
    /// Token for signalling graceful shutdown
    shutdown: CancellationToken,
}

impl DaemonService {
    /// Creates a new DaemonService
    ///
    /// Validates the configuration, opens the database and the key-value
    /// directory and builds the engine. Nothing is opened if the
    /// configuration has problems.
    async fn new(config: Config, shutdown: CancellationToken) -> Result<Self> {
        ensure_valid(&config)?;

        let db_pool = DatabasePool::new(&config.storage.database_path)
            .await
            .context("Failed to open database")?;
        let structured = Arc::new(SqliteStructuredStore::new(db_pool.pool().clone()));

        tokio::fs::create_dir_all(&config.storage.kv_dir)
            .await
            .with_context(|| {
                format!(
                    "Failed to create key-value directory {}",
                    config.storage.kv_dir.display()
                )
            })?;
        let kv = Arc::new(FileKeyValueStore::new(&config.storage.kv_dir));

        let storage = StorageService::new(structured)
            .with_default_sync_interval(config.sync.interval_minutes);
        let provider = Arc::new(BookmarkFileProvider::new(&config.provider.bookmarks_file));
        let engine = Arc::new(RefreshEngine::new(
            provider.clone(),
            storage.clone(),
            SnapshotCache::new(storage.clone(), kv),
            HistoryLog::new(storage.clone(), config.history.max_entries),
            Arc::new(SystemClock),
        ));

        info!(
            database = %config.storage.database_path.display(),
            bookmarks_file = %config.provider.bookmarks_file.display(),
            "Stores opened"
        );

        Ok(Self {
            config,
            storage,
            provider,
            engine,
            shutdown,
        })
    }

    /// Runs the daemon until the shutdown token is cancelled
    ///
    /// 1. Starts the scheduler task
    /// 2. Applies the stored sync interval
    /// 3. Subscribes to store changes and bookmarks file changes
    /// 4. Loads the baseline, refreshing if there is none
    /// 5. Waits for shutdown, then stops the scheduler
    async fn run(&self) -> Result<()> {
        let (scheduler, handle) = SyncScheduler::new(
            Arc::clone(&self.engine) as Arc<dyn Refresher>,
            Duration::from_millis(self.config.sync.debounce_ms),
        );
        let scheduler_task = tokio::spawn(scheduler.run());

        let interval = init_sync_settings(&self.storage, &handle).await;
        info!(interval_minutes = interval, "Sync interval applied");

        let _storage_watch = self.storage.store().subscribe(Arc::new(handle.clone()));

        let _tree_watch = match self.provider.watch(Arc::new(handle.clone())).await {
            Ok(watch) => watch,
            Err(e) => {
                warn!(
                    error = %e,
                    path = %self.provider.path().display(),
                    "Bookmarks file not watched; relying on periodic refresh"
                );
                WatchHandle::noop()
            }
        };

        match self.engine.load_initial_data().await {
            Some(outcome) => match serde_json::to_string(&outcome) {
                Ok(json) => info!(outcome = %json, "Initial refresh finished"),
                Err(e) => warn!(error = %e, "Failed to encode initial refresh outcome"),
            },
            None => info!("Using cached baseline"),
        }

        self.shutdown.cancelled().await;
        info!("Shutdown requested, stopping scheduler");

        handle.shutdown();
        if let Err(e) = scheduler_task.await {
            error!(error = %e, "Scheduler task ended abnormally");
        }

        Ok(())
    }
}

/// Rejects a configuration that failed validation, listing every problem
fn ensure_valid(config: &Config) -> Result<()> {
    let problems = config.validate();
    if problems.is_empty() {
        return Ok(());
    }

    for problem in &problems {
        error!(field = %problem.field, "Configuration problem: {}", problem.message);
    }
    let listed: Vec<String> = problems.iter().map(ToString::to_string).collect();
    anyhow::bail!("Invalid configuration: {}", listed.join("; "))
}

// ============================================================================
// Graceful shutdown signal handler
// ============================================================================

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = Config::default_path();
    let config = Config::load_or_default(&config_path);

    // RUST_LOG wins over the configured level
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    info!(config_path = %config_path.display(), "Markwatch daemon starting (markwatchd)");

    let shutdown_token = CancellationToken::new();

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let service = DaemonService::new(config, shutdown_token.clone()).await?;

    let result = service.run().await;

    match &result {
        Ok(()) => info!("Markwatch daemon shut down gracefully"),
        Err(e) => error!(error = %e, "Markwatch daemon exiting with error"),
    }

    result
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::path::Path;

    use markwatch_core::config::ConfigBuilder;

    use super::*;

    fn write_bookmarks(path: &Path) {
        let document = serde_json::json!({
            "roots": {
                "bookmark_bar": {
                    "id": "1", "name": "Bookmarks bar", "type": "folder",
                    "children": [
                        {"id": "10", "name": "Rust", "type": "url", "url": "https://rust-lang.org"}
                    ]
                },
                "other": {"id": "2", "name": "Other bookmarks", "type": "folder", "children": []},
                "synced": {"id": "3", "name": "Mobile bookmarks", "type": "folder", "children": []}
            },
            "version": 1
        });
        std::fs::write(path, document.to_string()).unwrap();
    }

    fn temp_config(dir: &Path) -> Config {
        ConfigBuilder::new()
            .storage_database_path(dir.join("data").join("markwatch.db"))
            .storage_kv_dir(dir.join("data").join("kv"))
            .provider_bookmarks_file(dir.join("Bookmarks"))
            .build()
    }

    #[tokio::test]
    async fn test_cancel_while_running_stops_scheduler() {
        let dir = tempfile::tempdir().unwrap();
        let config = temp_config(dir.path());
        write_bookmarks(&config.provider.bookmarks_file);

        let token = CancellationToken::new();
        let service = DaemonService::new(config, token.clone()).await.unwrap();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        // run() only returns after the scheduler task has been joined
        let result = tokio::time::timeout(Duration::from_secs(5), service.run()).await;
        assert!(matches!(result, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected_before_opening_stores() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigBuilder::new()
            .storage_database_path(dir.path().join("data").join("markwatch.db"))
            .storage_kv_dir(dir.path().join("data").join("kv"))
            .provider_bookmarks_file(dir.path().join("Bookmarks"))
            .history_max_entries(0)
            .build();

        let err = DaemonService::new(config, CancellationToken::new())
            .await
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("history.max_entries"));
        assert!(!dir.path().join("data").exists());
    }

    #[tokio::test]
    async fn test_zero_history_limit_leaves_stored_history_intact() {
        let dir = tempfile::tempdir().unwrap();
        let config = temp_config(dir.path());
        write_bookmarks(&config.provider.bookmarks_file);

        let token = CancellationToken::new();
        let service = DaemonService::new(config.clone(), token.clone())
            .await
            .unwrap();
        token.cancel();
        service.run().await.unwrap();
        assert_eq!(service.engine.history().entries().await.len(), 1);
        drop(service);

        let mut bad = config.clone();
        bad.history.max_entries = 0;
        assert!(DaemonService::new(bad, CancellationToken::new()).await.is_err());

        let reopened = DaemonService::new(config, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(reopened.engine.history().entries().await.len(), 1);
    }

    #[test]
    fn test_config_defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.sync.debounce_ms, 500);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_config_default_path_exists() {
        let path = Config::default_path();
        assert!(!path.as_os_str().is_empty());
    }

    #[tokio::test]
    async fn test_run_takes_first_snapshot_and_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let config = temp_config(dir.path());
        write_bookmarks(&config.provider.bookmarks_file);

        let token = CancellationToken::new();
        let service = DaemonService::new(config, token.clone()).await.unwrap();
        token.cancel();
        service.run().await.unwrap();

        let status = service.engine.status().await;
        assert_eq!(status.bookmark_count, 1);
        assert_eq!(status.history_count, 1);
        assert!(status.last_sync_time.is_some());
        assert!(dir.path().join("data").join("kv").is_dir());
    }

    #[tokio::test]
    async fn test_run_survives_missing_bookmarks_file() {
        let dir = tempfile::tempdir().unwrap();
        let token = CancellationToken::new();
        let service = DaemonService::new(temp_config(dir.path()), token.clone())
            .await
            .unwrap();
        token.cancel();

        service.run().await.unwrap();
        assert_eq!(service.engine.status().await.bookmark_count, 0);
    }
}
