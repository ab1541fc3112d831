//! Change history log
//!
//! A newest-first, size-bounded list of [`ChangeRecord`]s persisted under
//! the `bookmarkHistory` key. The log is append/truncate/clear only: no
//! single entry is ever rewritten or removed on its own.
//!
//! [`HistoryLog::append`] always re-reads the stored log before merging.
//! Another writer (a settings screen, another process) may have cleared the
//! log since we last looked, and merging into a stale copy would bring the
//! cleared entries back.

use std::collections::HashSet;

use tracing::{debug, warn};

use markwatch_core::domain::{ChangeRecord, StorageKey};

use crate::storage::{decode_history, StorageService};

/// Default number of entries kept
pub const DEFAULT_MAX_HISTORY_ENTRIES: usize = 100;

/// Bounded change history backed by the structured store
#[derive(Clone)]
pub struct HistoryLog {
    storage: StorageService,
    max_entries: usize,
}

impl HistoryLog {
    /// Creates a log that keeps at most `max_entries` records
    pub fn new(storage: StorageService, max_entries: usize) -> Self {
        Self {
            storage,
            max_entries,
        }
    }

    /// Returns the retention limit
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Returns the stored log, newest first
    pub async fn entries(&self) -> Vec<ChangeRecord> {
        decode_history(&self.storage.get_value(StorageKey::BookmarkHistory).await)
    }

    /// Prepends `changes` to the stored log and truncates it
    ///
    /// `changes` keep their own order at the front of the log. Returns the
    /// merged log, which is also what callers should cache in memory; a
    /// failed write is logged and the merged log is returned regardless.
    pub async fn append(&self, changes: &[ChangeRecord]) -> Vec<ChangeRecord> {
        let existing = self.entries().await;

        let mut merged = Vec::with_capacity((changes.len() + existing.len()).min(self.max_entries));
        merged.extend(changes.iter().cloned());
        merged.extend(existing);
        merged.truncate(self.max_entries);

        match serde_json::to_value(&merged) {
            Ok(value) => {
                if !self
                    .storage
                    .set_value(StorageKey::BookmarkHistory, value)
                    .await
                {
                    warn!("Failed to write change history");
                }
            }
            Err(e) => warn!(error = %e, "Failed to encode change history"),
        }

        debug!(
            appended = changes.len(),
            total = merged.len(),
            "History appended"
        );
        merged
    }

    /// Replaces the stored log with an empty list
    pub async fn clear(&self) -> bool {
        let ok = self
            .storage
            .set_value(StorageKey::BookmarkHistory, serde_json::json!([]))
            .await;
        if ok {
            debug!("History cleared");
        } else {
            warn!("Failed to clear change history");
        }
        ok
    }

    /// Returns the stored entries whose [`ChangeRecord::history_key`] is in `keys`
    ///
    /// Entries keep their log order.
    pub async fn select(&self, keys: &HashSet<String>) -> Vec<ChangeRecord> {
        self.entries()
            .await
            .into_iter()
            .filter(|record| keys.contains(&record.history_key()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::testing::MemoryStructuredStore;
    use markwatch_core::ports::IStructuredStore;

    fn add(title: &str, timestamp: i64) -> ChangeRecord {
        ChangeRecord::Add {
            title: title.to_string(),
            url: format!("https://example.com/{title}"),
            path: "Bar".to_string(),
            timestamp,
        }
    }

    fn setup(max_entries: usize) -> (Arc<MemoryStructuredStore>, HistoryLog) {
        let store = Arc::new(MemoryStructuredStore::default());
        let log = HistoryLog::new(StorageService::new(store.clone()), max_entries);
        (store, log)
    }

    #[tokio::test]
    async fn test_append_prepends_newest_first() {
        let (_store, log) = setup(DEFAULT_MAX_HISTORY_ENTRIES);
        log.append(&[add("a", 1)]).await;
        log.append(&[add("b", 2), add("c", 2)]).await;

        let titles: Vec<_> = log
            .entries()
            .await
            .iter()
            .map(|r| r.title().to_string())
            .collect();
        assert_eq!(titles, vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn test_append_truncates_oldest() {
        let (_store, log) = setup(3);
        for i in 0..5 {
            let merged = log.append(&[add(&format!("t{i}"), i)]).await;
            assert!(merged.len() <= 3);
        }
        let titles: Vec<_> = log
            .entries()
            .await
            .iter()
            .map(|r| r.title().to_string())
            .collect();
        assert_eq!(titles, vec!["t4", "t3", "t2"]);
    }

    #[tokio::test]
    async fn test_oversized_batch_is_cut_to_limit() {
        let (_store, log) = setup(2);
        let merged = log.append(&[add("x", 1), add("y", 1), add("z", 1)]).await;
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].title(), "x");
    }

    #[tokio::test]
    async fn test_append_rereads_store_before_merging() {
        let (store, log) = setup(DEFAULT_MAX_HISTORY_ENTRIES);
        log.append(&[add("old", 1)]).await;

        // Another writer clears the log behind our back
        store
            .set(std::collections::HashMap::from([(
                StorageKey::BookmarkHistory,
                json!([]),
            )]))
            .await
            .unwrap();

        let merged = log.append(&[add("new", 2)]).await;
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title(), "new");
    }

    #[tokio::test]
    async fn test_clear_empties_log() {
        let (store, log) = setup(DEFAULT_MAX_HISTORY_ENTRIES);
        log.append(&[add("a", 1)]).await;
        assert!(log.clear().await);
        assert!(log.entries().await.is_empty());
        assert_eq!(store.value(StorageKey::BookmarkHistory), Some(json!([])));
    }

    #[tokio::test]
    async fn test_write_failure_still_returns_merged_log() {
        let (store, log) = setup(DEFAULT_MAX_HISTORY_ENTRIES);
        store.fail_writes.store(true, Ordering::SeqCst);
        let merged = log.append(&[add("a", 1)]).await;
        assert_eq!(merged.len(), 1);
        assert!(log.entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_select_by_history_key_keeps_log_order() {
        let (_store, log) = setup(DEFAULT_MAX_HISTORY_ENTRIES);
        log.append(&[add("a", 1)]).await;
        log.append(&[add("b", 2)]).await;
        log.append(&[add("c", 3)]).await;

        let keys: HashSet<String> = [add("a", 1).history_key(), add("c", 3).history_key()]
            .into_iter()
            .collect();
        let selected = log.select(&keys).await;
        let titles: Vec<_> = selected.iter().map(|r| r.title()).collect();
        assert_eq!(titles, vec!["c", "a"]);
    }
}
