//! Typed access to the structured store
//!
//! [`StorageService`] wraps an [`IStructuredStore`] and never fails: missing
//! keys come back as their defaults, a failed read yields every requested
//! key's default, and a failed write is logged and reported as `false`.
//! The decode helpers are equally forgiving so that a garbled or foreign
//! value degrades to a default instead of blocking start-up.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use markwatch_core::domain::{BookmarkRecord, ChangeRecord, StorageKey};
use markwatch_core::ports::IStructuredStore;

/// Defaulting wrapper over the structured store
#[derive(Clone)]
pub struct StorageService {
    store: Arc<dyn IStructuredStore>,
    default_sync_interval: Option<u32>,
}

impl StorageService {
    /// Creates a service over `store` using the built-in key defaults
    pub fn new(store: Arc<dyn IStructuredStore>) -> Self {
        Self {
            store,
            default_sync_interval: None,
        }
    }

    /// Overrides the default returned for a missing `syncInterval`
    #[must_use]
    pub fn with_default_sync_interval(mut self, minutes: u32) -> Self {
        self.default_sync_interval = Some(minutes);
        self
    }

    /// Returns the underlying store
    pub fn store(&self) -> &Arc<dyn IStructuredStore> {
        &self.store
    }

    fn default_for(&self, key: StorageKey) -> Value {
        match (key, self.default_sync_interval) {
            (StorageKey::SyncInterval, Some(minutes)) => Value::from(minutes),
            _ => key.default_value(),
        }
    }

    /// Reads `keys`, filling in the default for any key that is absent
    ///
    /// If the store cannot be read at all, every key gets its default.
    pub async fn get(&self, keys: &[StorageKey]) -> HashMap<StorageKey, Value> {
        let mut values = match self.store.get(keys).await {
            Ok(values) => values,
            Err(e) => {
                warn!(error = %e, "Failed to read structured store, using defaults");
                HashMap::new()
            }
        };
        for key in keys {
            values
                .entry(*key)
                .or_insert_with(|| self.default_for(*key));
        }
        values
    }

    /// Reads a single key, falling back to its default
    pub async fn get_value(&self, key: StorageKey) -> Value {
        self.get(&[key])
            .await
            .remove(&key)
            .unwrap_or_else(|| self.default_for(key))
    }

    /// Writes all entries, returning whether the write succeeded
    pub async fn set(&self, entries: HashMap<StorageKey, Value>) -> bool {
        let keys: Vec<StorageKey> = entries.keys().copied().collect();
        match self.store.set(entries).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, ?keys, "Failed to write structured store");
                false
            }
        }
    }

    /// Writes a single key, returning whether the write succeeded
    pub async fn set_value(&self, key: StorageKey, value: Value) -> bool {
        self.set(HashMap::from([(key, value)])).await
    }

    /// Reads the stored `syncInterval` in minutes
    pub async fn sync_interval(&self) -> u32 {
        let value = self.get_value(StorageKey::SyncInterval).await;
        decode_interval(&value).unwrap_or_else(|| {
            decode_interval(&self.default_for(StorageKey::SyncInterval)).unwrap_or_default()
        })
    }

    /// Reads the stored `lastSyncTime` (ms epoch)
    pub async fn last_sync_time(&self) -> Option<i64> {
        decode_timestamp(&self.get_value(StorageKey::LastSyncTime).await)
    }
}

// ============================================================================
// Value decoding
// ============================================================================

/// Decodes a bookmark list, skipping entries that are not valid records
///
/// Returns `None` if `value` is not an array at all.
pub fn decode_bookmarks(value: &Value) -> Option<Vec<BookmarkRecord>> {
    decode_list(value, "bookmark")
}

/// Decodes a history list, dropping entries that cannot be read
///
/// Entries written with the legacy `update` action decode as edits.
pub fn decode_history(value: &Value) -> Vec<ChangeRecord> {
    decode_list(value, "history entry").unwrap_or_default()
}

/// Decodes a non-negative whole number of minutes
pub fn decode_interval(value: &Value) -> Option<u32> {
    if let Some(minutes) = value.as_u64() {
        return u32::try_from(minutes).ok();
    }
    // Some writers store the interval as a float or a numeric string
    let minutes = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if minutes.is_finite() && minutes >= 0.0 && minutes <= f64::from(u32::MAX) {
        Some(minutes as u32)
    } else {
        None
    }
}

/// Decodes an ms-epoch timestamp; `null` and non-numbers are `None`
pub fn decode_timestamp(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|t| t.is_finite()).map(|t| t as i64))
}

fn decode_list<T: serde::de::DeserializeOwned>(value: &Value, what: &str) -> Option<Vec<T>> {
    let items = value.as_array()?;
    let mut decoded = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match T::deserialize(item) {
            Ok(entry) => decoded.push(entry),
            Err(e) => debug!(index, error = %e, "Dropping unreadable {}", what),
        }
    }
    Some(decoded)
}
