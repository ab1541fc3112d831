//! Structured-store keys and their built-in defaults
//!
//! The structured store holds one row per [`StorageKey`]. A key that has
//! never been written (or a store that cannot be read) resolves to the
//! key's default, so a fresh or corrupted store never blocks start-up.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::DomainError;

/// Default periodic sync interval, in minutes
pub const DEFAULT_SYNC_INTERVAL_MINUTES: u32 = 30;

/// Default UI theme name (stored for the settings screen, unused by the engine)
pub const DEFAULT_THEME: &str = "original";

/// Key under which the key-value backend caches the bookmark snapshot
pub const KV_BOOKMARKS_KEY: &str = "cachedBookmarks";

/// Keys of the structured store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StorageKey {
    /// Flat list of [`BookmarkRecord`](super::BookmarkRecord)s
    #[serde(rename = "bookmarks")]
    Bookmarks,
    /// Newest-first list of [`ChangeRecord`](super::ChangeRecord)s
    #[serde(rename = "bookmarkHistory")]
    BookmarkHistory,
    /// Time of the last successful refresh (ms epoch), or null
    #[serde(rename = "lastSyncTime")]
    LastSyncTime,
    /// Periodic sync interval in minutes (0 = disabled)
    #[serde(rename = "syncInterval")]
    SyncInterval,
    /// Theme name
    #[serde(rename = "theme")]
    Theme,
}

impl StorageKey {
    /// Every key, in storage order
    pub const ALL: [StorageKey; 5] = [
        StorageKey::Bookmarks,
        StorageKey::BookmarkHistory,
        StorageKey::LastSyncTime,
        StorageKey::SyncInterval,
        StorageKey::Theme,
    ];

    /// Returns the persisted name of the key
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::Bookmarks => "bookmarks",
            StorageKey::BookmarkHistory => "bookmarkHistory",
            StorageKey::LastSyncTime => "lastSyncTime",
            StorageKey::SyncInterval => "syncInterval",
            StorageKey::Theme => "theme",
        }
    }

    /// Returns the value a missing key resolves to
    pub fn default_value(&self) -> Value {
        match self {
            StorageKey::Bookmarks | StorageKey::BookmarkHistory => Value::Array(Vec::new()),
            StorageKey::LastSyncTime => Value::Null,
            StorageKey::SyncInterval => Value::from(DEFAULT_SYNC_INTERVAL_MINUTES),
            StorageKey::Theme => Value::from(DEFAULT_THEME),
        }
    }
}

impl Display for StorageKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StorageKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| DomainError::UnknownStorageKey(s.to_string()))
    }
}
