//! SQLite implementation of IStructuredStore
//!
//! Each [`StorageKey`] is one row of the `settings` table. Values are stored
//! as JSON text so the adapter needs no knowledge of the domain types behind
//! them.
//!
//! ## Change notifications
//!
//! After a `set` commits, every subscribed [`IStorageObserver`] receives the
//! keys whose value actually changed, with old and new values, tagged with
//! the store's area name. Writes that change nothing notify nobody.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use sqlx::{Row, SqlitePool};

use markwatch_core::domain::StorageKey;
use markwatch_core::ports::{
    IStorageObserver, IStructuredStore, StorageChange, WatchHandle, LOCAL_AREA,
};

use crate::CacheError;

type ObserverList = Arc<Mutex<Vec<(u64, Arc<dyn IStorageObserver>)>>>;

/// SQLite-based implementation of the structured store port
pub struct SqliteStructuredStore {
    pool: SqlitePool,
    area: String,
    observers: ObserverList,
    next_observer_id: AtomicU64,
}

impl SqliteStructuredStore {
    /// Creates a store for the `local` area over the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_area(pool, LOCAL_AREA)
    }

    /// Creates a store that reports `area` to its observers
    pub fn with_area(pool: SqlitePool, area: impl Into<String>) -> Self {
        Self {
            pool,
            area: area.into(),
            observers: Arc::new(Mutex::new(Vec::new())),
            next_observer_id: AtomicU64::new(1),
        }
    }

    /// Returns the number of registered observers
    pub fn observer_count(&self) -> usize {
        self.observers.lock().map(|list| list.len()).unwrap_or(0)
    }

    fn notify(&self, changes: &[StorageChange]) {
        let observers: Vec<Arc<dyn IStorageObserver>> = match self.observers.lock() {
            Ok(list) => list.iter().map(|(_, observer)| observer.clone()).collect(),
            Err(_) => return,
        };
        for observer in observers {
            observer.on_changed(changes, &self.area);
        }
    }
}

fn decode_value(key: StorageKey, raw: &str) -> Result<Value, CacheError> {
    serde_json::from_str(raw).map_err(|e| {
        CacheError::SerializationError(format!("Stored value for {} is not JSON: {}", key, e))
    })
}

#[async_trait::async_trait]
impl IStructuredStore for SqliteStructuredStore {
    fn area(&self) -> &str {
        &self.area
    }

    async fn get(&self, keys: &[StorageKey]) -> anyhow::Result<HashMap<StorageKey, Value>> {
        let mut values = HashMap::with_capacity(keys.len());

        for key in keys {
            let row = sqlx::query("SELECT value FROM settings WHERE key = ?")
                .bind(key.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(CacheError::from)?;

            if let Some(row) = row {
                let raw: String = row.try_get("value").map_err(CacheError::from)?;
                values.insert(*key, decode_value(*key, &raw)?);
            }
        }

        Ok(values)
    }

    async fn set(&self, entries: HashMap<StorageKey, Value>) -> anyhow::Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut entries: Vec<(StorageKey, Value)> = entries.into_iter().collect();
        entries.sort_by_key(|(key, _)| *key);

        let updated_at = chrono::Utc::now().to_rfc3339();
        let mut changes = Vec::new();
        let mut tx = self.pool.begin().await.map_err(CacheError::from)?;

        for (key, value) in entries {
            let previous: Option<String> =
                sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
                    .bind(key.as_str())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(CacheError::from)?;
            // A garbled previous value is reported as absent rather than failing the write
            let old_value = previous.and_then(|raw| serde_json::from_str::<Value>(&raw).ok());

            let encoded = serde_json::to_string(&value).map_err(CacheError::from)?;
            sqlx::query(
                "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?, ?, ?)",
            )
            .bind(key.as_str())
            .bind(&encoded)
            .bind(&updated_at)
            .execute(&mut *tx)
            .await
            .map_err(CacheError::from)?;

            if old_value.as_ref() != Some(&value) {
                changes.push(StorageChange {
                    key,
                    old_value,
                    new_value: Some(value),
                });
            }
        }

        tx.commit().await.map_err(CacheError::from)?;

        tracing::trace!(changed = changes.len(), area = %self.area, "Stored settings");

        if !changes.is_empty() {
            self.notify(&changes);
        }
        Ok(())
    }

    fn subscribe(&self, observer: Arc<dyn IStorageObserver>) -> WatchHandle {
        let id = self.next_observer_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut list) = self.observers.lock() {
            list.push((id, observer));
        }

        let observers = Arc::downgrade(&self.observers);
        WatchHandle::new(move || {
            if let Some(observers) = observers.upgrade() {
                if let Ok(mut list) = observers.lock() {
                    list.retain(|(observer_id, _)| *observer_id != id);
                }
            }
        })
    }
}
