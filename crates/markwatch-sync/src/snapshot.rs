//! Snapshot cache mirrored across two persistent stores
//!
//! The in-memory snapshot (flat bookmark list plus change history) is the
//! baseline every diff runs against. It is hydrated once per process from
//! the stores and written back after each refresh that found changes.
//!
//! ## Backends
//!
//! | Store       | Holds                                 | Role                         |
//! |-------------|---------------------------------------|------------------------------|
//! | key-value   | `cachedBookmarks`                     | preferred source, no quota   |
//! | structured  | bookmarks, history, lastSyncTime, ... | cheap to read at start-up    |
//!
//! The two are best-effort mirrors, not a transactional pair. Each write is
//! attempted independently and a failure on one side is only logged.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use markwatch_core::domain::{BookmarkRecord, ChangeRecord, StorageKey, KV_BOOKMARKS_KEY};
use markwatch_core::ports::IKeyValueStore;

use crate::storage::{decode_bookmarks, decode_history, StorageService};

#[derive(Default)]
struct CacheState {
    bookmarks: Vec<BookmarkRecord>,
    history: Vec<ChangeRecord>,
    loaded: bool,
}

/// Where a loaded snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    /// The key-value store's copy was used
    KeyValue,
    /// The structured store's copy was used
    Structured,
}

/// Outcome of [`SnapshotCache::save`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveReport {
    /// The key-value write succeeded
    pub key_value: bool,
    /// The structured write (bookmarks + sync time) succeeded
    pub structured: bool,
}

impl SaveReport {
    /// Returns true if both backends were written
    pub fn is_complete(&self) -> bool {
        self.key_value && self.structured
    }
}

/// In-memory snapshot with two persistent mirrors
pub struct SnapshotCache {
    storage: StorageService,
    kv: Arc<dyn IKeyValueStore>,
    state: Mutex<CacheState>,
}

impl SnapshotCache {
    /// Creates an unloaded cache over the two stores
    pub fn new(storage: StorageService, kv: Arc<dyn IKeyValueStore>) -> Self {
        Self {
            storage,
            kv,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Hydrates the snapshot from the stores, once per cache instance
    ///
    /// The key-value copy wins when it holds a non-empty list, or when the
    /// structured store has nothing either. Otherwise the structured copy is
    /// used and, if the key-value copy was empty or missing, written back to
    /// the key-value store before returning.
    ///
    /// Read failures fall back to empty lists. Returns `None` if the cache
    /// was already loaded.
    #[tracing::instrument(skip(self))]
    pub async fn load(&self) -> Option<SnapshotSource> {
        let mut state = self.state.lock().await;
        if state.loaded {
            return None;
        }

        let kv_bookmarks = match self.kv.get(KV_BOOKMARKS_KEY).await {
            Ok(value) => value.as_ref().and_then(decode_bookmarks),
            Err(e) => {
                warn!(error = %e, "Failed to read bookmark cache from key-value store");
                None
            }
        };

        let stored = self
            .storage
            .get(&[StorageKey::Bookmarks, StorageKey::BookmarkHistory])
            .await;
        let structured_bookmarks = stored
            .get(&StorageKey::Bookmarks)
            .and_then(decode_bookmarks)
            .unwrap_or_default();
        let history = stored
            .get(&StorageKey::BookmarkHistory)
            .map(decode_history)
            .unwrap_or_default();

        let kv_empty = kv_bookmarks.as_ref().map_or(true, Vec::is_empty);
        let (bookmarks, source) = match kv_bookmarks {
            Some(list) if !list.is_empty() || structured_bookmarks.is_empty() => {
                (list, SnapshotSource::KeyValue)
            }
            _ => (structured_bookmarks, SnapshotSource::Structured),
        };

        if kv_empty && !bookmarks.is_empty() {
            match serde_json::to_value(&bookmarks) {
                Ok(value) => match self.kv.set(KV_BOOKMARKS_KEY, &value).await {
                    Ok(()) => info!(count = bookmarks.len(), "Backfilled key-value bookmark cache"),
                    Err(e) => warn!(error = %e, "Failed to backfill key-value bookmark cache"),
                },
                Err(e) => warn!(error = %e, "Failed to encode bookmarks for backfill"),
            }
        }

        info!(
            bookmarks = bookmarks.len(),
            history = history.len(),
            ?source,
            "Snapshot cache loaded"
        );

        state.bookmarks = bookmarks;
        state.history = history;
        state.loaded = true;
        Some(source)
    }

    /// Returns true once [`load`](Self::load) has run
    pub async fn is_loaded(&self) -> bool {
        self.state.lock().await.loaded
    }

    /// Returns a copy of the in-memory bookmark snapshot
    pub async fn bookmarks(&self) -> Vec<BookmarkRecord> {
        self.state.lock().await.bookmarks.clone()
    }

    /// Returns the number of bookmarks in the in-memory snapshot
    pub async fn bookmark_count(&self) -> usize {
        self.state.lock().await.bookmarks.len()
    }

    /// Returns a copy of the in-memory history
    pub async fn history(&self) -> Vec<ChangeRecord> {
        self.state.lock().await.history.clone()
    }

    /// Replaces the in-memory history
    pub async fn set_history(&self, history: Vec<ChangeRecord>) {
        self.state.lock().await.history = history;
    }

    /// Replaces the snapshot and writes it to both stores
    ///
    /// The in-memory snapshot is updated even if both writes fail.
    #[tracing::instrument(skip(self, bookmarks), fields(count = bookmarks.len()))]
    pub async fn save(&self, bookmarks: Vec<BookmarkRecord>, sync_time: i64) -> SaveReport {
        let mut state = self.state.lock().await;

        let report = match serde_json::to_value(&bookmarks) {
            Ok(value) => {
                let key_value = match self.kv.set(KV_BOOKMARKS_KEY, &value).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(error = %e, "Failed to write key-value bookmark cache");
                        false
                    }
                };

                let structured = self
                    .storage
                    .set(HashMap::from([
                        (StorageKey::Bookmarks, value),
                        (StorageKey::LastSyncTime, Value::from(sync_time)),
                    ]))
                    .await;
                if !structured {
                    warn!("Failed to write bookmarks to structured store");
                }

                SaveReport {
                    key_value,
                    structured,
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to encode bookmark snapshot");
                SaveReport {
                    key_value: false,
                    structured: false,
                }
            }
        };

        state.bookmarks = bookmarks;
        debug!(?report, "Snapshot saved");
        report
    }

    /// Records a successful check that found no changes
    pub async fn record_sync_time(&self, sync_time: i64) -> bool {
        let ok = self
            .storage
            .set_value(StorageKey::LastSyncTime, Value::from(sync_time))
            .await;
        if !ok {
            warn!("Failed to write last sync time");
        }
        ok
    }
}
