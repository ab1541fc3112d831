//! Refresh coordinator
//!
//! The [`RefreshEngine`] runs one end-to-end refresh pass at a time:
//!
//! 1. **Load**: hydrate the snapshot cache if this is the first pass
//! 2. **Fetch**: ask the tree provider for the current forest
//! 3. **Diff**: flatten it and compare against the cached snapshot by id
//! 4. **Persist**: on changes, prepend them to the history and save the new
//!    snapshot; otherwise only record the sync time as a heartbeat
//!
//! ## Single-flight
//!
//! A `refresh()` issued while a pass is running does no work of its own. It
//! marks the engine as queued and returns [`RefreshOutcome::Skipped`]. When
//! the running pass finishes it checks the mark and, if set, runs exactly one
//! more pass, so any burst of overlapping requests costs at most two passes
//! and no request is lost. The queued check and the return to idle happen
//! under the same lock.
//!
//! Only a tree fetch failure fails a pass. Persistence problems are logged
//! by the cache and history layers and never abort a pass.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Serialize, Serializer};
use tracing::{debug, error, info};

use markwatch_core::domain::{diff_bookmarks, flatten_tree, Clock};
use markwatch_core::ports::ITreeProvider;

use crate::history::HistoryLog;
use crate::snapshot::SnapshotCache;
use crate::storage::StorageService;

// ============================================================================
// RefreshOutcome
// ============================================================================

/// Counts reported by a completed pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Number of bookmarks in the fresh snapshot
    pub count: usize,
    /// Number of change records the pass produced
    pub changes: usize,
}

/// Result of a [`RefreshEngine::refresh`] call
///
/// Serializes to `{success, count?, changes?, error?, skipped?}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The last pass of this call completed
    Completed(RefreshSummary),
    /// Another call was already refreshing; this request was folded into it
    Skipped,
    /// The bookmark tree could not be fetched
    Failed {
        /// Error message
        error: String,
    },
}

impl RefreshOutcome {
    /// Returns true for [`RefreshOutcome::Completed`]
    pub fn is_success(&self) -> bool {
        matches!(self, RefreshOutcome::Completed(_))
    }

    /// Returns true for [`RefreshOutcome::Skipped`]
    pub fn is_skipped(&self) -> bool {
        matches!(self, RefreshOutcome::Skipped)
    }
}

#[derive(Serialize)]
struct OutcomeBody<'a> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    changes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    skipped: Option<bool>,
}

impl Serialize for RefreshOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let body = match self {
            RefreshOutcome::Completed(summary) => OutcomeBody {
                success: true,
                count: Some(summary.count),
                changes: Some(summary.changes),
                error: None,
                skipped: None,
            },
            RefreshOutcome::Skipped => OutcomeBody {
                success: false,
                count: None,
                changes: None,
                error: None,
                skipped: Some(true),
            },
            RefreshOutcome::Failed { error } => OutcomeBody {
                success: false,
                count: None,
                changes: None,
                error: Some(error.as_str()),
                skipped: None,
            },
        };
        body.serialize(serializer)
    }
}

// ============================================================================
// SyncStatus
// ============================================================================

/// Snapshot of the engine's persisted sync state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    /// Bookmarks in the cached snapshot
    pub bookmark_count: usize,
    /// Entries in the stored history
    pub history_count: usize,
    /// Last successful check (ms epoch)
    pub last_sync_time: Option<i64>,
    /// Periodic interval in minutes (0 = disabled)
    pub sync_interval_minutes: u32,
    /// When the next periodic check is due (ms epoch)
    pub next_sync_time: Option<i64>,
}

impl SyncStatus {
    /// Computes the next due time from the last sync and the interval
    pub fn next_sync_time(last_sync_time: Option<i64>, interval_minutes: u32) -> Option<i64> {
        match last_sync_time {
            Some(last) if interval_minutes > 0 => {
                Some(last.saturating_add(i64::from(interval_minutes) * 60_000))
            }
            _ => None,
        }
    }
}

// ============================================================================
// Refresher trait
// ============================================================================

/// Anything the scheduler can ask to refresh
#[async_trait::async_trait]
pub trait Refresher: Send + Sync {
    /// Runs (or joins) a refresh
    async fn refresh(&self) -> RefreshOutcome;
}

// ============================================================================
// Single-flight state
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshState {
    Idle,
    Refreshing,
}

#[derive(Debug)]
struct FlightState {
    state: RefreshState,
    queued: bool,
}

/// Returns the engine to idle if a refresh future is dropped mid-pass
struct FlightGuard<'a> {
    flight: &'a Mutex<FlightState>,
    armed: bool,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut flight = self.flight.lock().unwrap_or_else(PoisonError::into_inner);
            flight.state = RefreshState::Idle;
            flight.queued = false;
        }
    }
}

// ============================================================================
// RefreshEngine
// ============================================================================

/// Coordinates refresh passes over the bookmark tree
pub struct RefreshEngine {
    provider: Arc<dyn ITreeProvider>,
    storage: StorageService,
    cache: SnapshotCache,
    history: HistoryLog,
    clock: Arc<dyn Clock>,
    flight: Mutex<FlightState>,
}

impl RefreshEngine {
    /// Creates a new `RefreshEngine`
    ///
    /// # Arguments
    /// * `provider` - Source of bookmark tree snapshots
    /// * `storage` - Structured store access (sync time, interval)
    /// * `cache` - Snapshot cache diffed against on each pass
    /// * `history` - Change history receiving detected changes
    /// * `clock` - Time source for change and sync timestamps
    pub fn new(
        provider: Arc<dyn ITreeProvider>,
        storage: StorageService,
        cache: SnapshotCache,
        history: HistoryLog,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            provider,
            storage,
            cache,
            history,
            clock,
            flight: Mutex::new(FlightState {
                state: RefreshState::Idle,
                queued: false,
            }),
        }
    }

    /// Returns the snapshot cache
    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    /// Returns the history log
    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Returns the structured store service
    pub fn storage(&self) -> &StorageService {
        &self.storage
    }

    fn flight(&self) -> MutexGuard<'_, FlightState> {
        self.flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns true while a pass is running
    pub fn is_refreshing(&self) -> bool {
        self.flight().state == RefreshState::Refreshing
    }

    /// Refreshes the snapshot, or joins the refresh already in flight
    ///
    /// Never returns an error: a fetch failure becomes
    /// [`RefreshOutcome::Failed`]. When passes repeat because of queued
    /// requests, the outcome of the last pass is returned.
    #[tracing::instrument(skip(self))]
    pub async fn refresh(&self) -> RefreshOutcome {
        {
            let mut flight = self.flight();
            if flight.state == RefreshState::Refreshing {
                flight.queued = true;
                info!("Refresh already in progress, queued another pass");
                return RefreshOutcome::Skipped;
            }
            flight.state = RefreshState::Refreshing;
            flight.queued = false;
        }

        let mut guard = FlightGuard {
            flight: &self.flight,
            armed: true,
        };

        let mut passes = 0u32;
        loop {
            passes += 1;
            let outcome = self.refresh_once().await;

            let mut flight = self.flight();
            if flight.queued {
                flight.queued = false;
                debug!(passes, "Running queued refresh pass");
                continue;
            }
            flight.state = RefreshState::Idle;
            guard.armed = false;
            return outcome;
        }
    }

    async fn refresh_once(&self) -> RefreshOutcome {
        debug!("Starting refresh pass");

        // The baseline must be in memory before diffing, or every bookmark
        // of an existing profile would be reported as added
        self.cache.load().await;

        let sync_time = self.clock.now_millis();
        let tree = match self.provider.get_tree().await {
            Ok(tree) => tree,
            Err(e) => {
                error!(error = %e, "Failed to fetch bookmark tree");
                return RefreshOutcome::Failed {
                    error: format!("{e:#}"),
                };
            }
        };

        let current = flatten_tree(&tree);
        let previous = self.cache.bookmarks().await;
        let changes = diff_bookmarks(&previous, &current, self.clock.as_ref());
        let summary = RefreshSummary {
            count: current.len(),
            changes: changes.len(),
        };

        if changes.is_empty() {
            debug!(count = summary.count, "No bookmark changes");
            self.cache.record_sync_time(sync_time).await;
        } else {
            info!(changes = summary.changes, "Bookmark changes detected");
            let history = self.history.append(&changes).await;
            self.cache.set_history(history).await;
            self.cache.save(current, sync_time).await;
        }

        RefreshOutcome::Completed(summary)
    }

    /// Hydrates the cache and refreshes once if it holds no bookmarks
    ///
    /// Returns the refresh outcome when a refresh was needed.
    #[tracing::instrument(skip(self))]
    pub async fn load_initial_data(&self) -> Option<RefreshOutcome> {
        self.cache.load().await;

        let count = self.cache.bookmark_count().await;
        let outcome = if count > 0 {
            info!(count, "Loaded cached bookmarks");
            None
        } else {
            Some(self.refresh().await)
        };

        info!(
            history = self.history.entries().await.len(),
            "Loaded change history"
        );
        outcome
    }

    /// Empties the stored history and the in-memory copy
    ///
    /// The in-memory copy is left alone if the store write fails.
    pub async fn clear_history(&self) -> bool {
        let cleared = self.history.clear().await;
        if cleared {
            self.cache.set_history(Vec::new()).await;
        }
        cleared
    }

    /// Reports counts, last sync time and the next periodic due time
    pub async fn status(&self) -> SyncStatus {
        self.cache.load().await;

        let last_sync_time = self.storage.last_sync_time().await;
        let sync_interval_minutes = self.storage.sync_interval().await;
        SyncStatus {
            bookmark_count: self.cache.bookmark_count().await,
            history_count: self.history.entries().await.len(),
            last_sync_time,
            sync_interval_minutes,
            next_sync_time: SyncStatus::next_sync_time(last_sync_time, sync_interval_minutes),
        }
    }
}

#[async_trait::async_trait]
impl Refresher for RefreshEngine {
    async fn refresh(&self) -> RefreshOutcome {
        RefreshEngine::refresh(self).await
    }
}
