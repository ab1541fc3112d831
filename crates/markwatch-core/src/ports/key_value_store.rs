//! Key-value store port (driven/secondary port)
//!
//! A large-capacity store of JSON documents addressed by string keys. The
//! engine keeps its preferred copy of the bookmark snapshot here under
//! [`KV_BOOKMARKS_KEY`](crate::domain::KV_BOOKMARKS_KEY).

use serde_json::Value;

/// Port trait for the key-value store
#[async_trait::async_trait]
pub trait IKeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` if absent
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>>;

    /// Stores `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &Value) -> anyhow::Result<()>;

    /// Removes `key`; removing an absent key is not an error
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
}
