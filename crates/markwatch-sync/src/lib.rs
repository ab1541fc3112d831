//! Markwatch Sync - Bookmark change detection engine
//!
//! Provides:
//! - Snapshot refresh with single-flight coalescing
//! - A bounded, newest-first change history
//! - A snapshot cache mirrored across two persistent stores
//! - Periodic and debounced refresh scheduling
//!
//! ## Modules
//!
//! - [`engine`] - Refresh coordinator (fetch, flatten, diff, persist)
//! - [`snapshot`] - Dual-store snapshot cache with one-time backfill
//! - [`history`] - Change history log
//! - [`storage`] - Typed access to the structured store with defaults
//! - [`scheduler`] - Periodic and debounced refresh triggers
//! - [`provider`] - Chromium `Bookmarks` file tree provider
//! - [`watcher`] - `notify` event mapping for the bookmarks file

pub mod engine;
pub mod history;
pub mod provider;
pub mod scheduler;
pub mod snapshot;
pub mod storage;
pub mod watcher;

#[cfg(test)]
pub(crate) mod testing;

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading the bookmark source
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error occurred while reading the bookmarks file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The bookmarks file is not valid Chromium bookmarks JSON
    #[error("Malformed bookmarks file {path}: {reason}")]
    MalformedBookmarks {
        /// File that failed to parse
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// The bookmarks file cannot be watched
    #[error("Watch failed for {path}: {reason}")]
    WatchFailed {
        /// File that was to be watched
        path: PathBuf,
        /// Watcher message
        reason: String,
    },
}
