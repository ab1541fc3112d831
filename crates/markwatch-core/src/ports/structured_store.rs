//! Structured store port (driven/secondary port)
//!
//! A small key/value area holding the engine's persisted row: bookmarks,
//! history, last sync time, sync interval and theme. It is the store that
//! is cheap to read at start-up, but its capacity is limited, which is why
//! the bookmark snapshot is mirrored into an [`IKeyValueStore`](super::IKeyValueStore).
//!
//! ## Design Notes
//!
//! - Values are `serde_json::Value` so adapters need no knowledge of domain types.
//! - `get` returns only the keys that are present; callers apply defaults
//!   via [`StorageKey::default_value`].
//! - Writers notify subscribed [`IStorageObserver`]s with old/new value pairs
//!   scoped to the store's named area.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::domain::storage::StorageKey;

use super::watch::WatchHandle;

/// Area name of the engine's local settings store
pub const LOCAL_AREA: &str = "local";

/// One key's transition as seen by an observer
#[derive(Debug, Clone, PartialEq)]
pub struct StorageChange {
    /// The key that was written
    pub key: StorageKey,
    /// Value before the write (`None` if the key was absent)
    pub old_value: Option<Value>,
    /// Value after the write (`None` if the key was removed)
    pub new_value: Option<Value>,
}

/// Observer for structured-store writes
pub trait IStorageObserver: Send + Sync {
    /// Called after a write commits, with every key it touched
    fn on_changed(&self, changes: &[StorageChange], area: &str);
}

/// Port trait for the structured store
#[async_trait::async_trait]
pub trait IStructuredStore: Send + Sync {
    /// Name of the storage area (e.g. `local`) reported to observers
    fn area(&self) -> &str;

    /// Reads the given keys, omitting any that are not stored
    async fn get(&self, keys: &[StorageKey]) -> anyhow::Result<HashMap<StorageKey, Value>>;

    /// Writes all entries, then notifies observers
    async fn set(&self, entries: HashMap<StorageKey, Value>) -> anyhow::Result<()>;

    /// Registers an observer for subsequent writes
    ///
    /// Returns a handle that unregisters the observer when dropped.
    fn subscribe(&self, observer: Arc<dyn IStorageObserver>) -> WatchHandle;
}
