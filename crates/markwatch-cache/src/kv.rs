//! File-backed implementation of IKeyValueStore
//!
//! Every key is one `<key>.json` document inside the store directory.
//! Writes go to a temporary sibling first and are then renamed over the
//! target, so a crash never leaves a half-written document behind.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use markwatch_core::ports::IKeyValueStore;

use crate::CacheError;

/// Directory of JSON documents, one per key
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Creates a store rooted at `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the store directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Maps `key` to its document path
    ///
    /// # Errors
    /// Returns `CacheError::InvalidKey` if the key is empty, starts with a dot
    /// or contains a path separator.
    fn document_path(&self, key: &str) -> Result<PathBuf, CacheError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && !key.contains(['/', '\\', '\0']);
        if !valid {
            return Err(CacheError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait::async_trait]
impl IKeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        let path = self.document_path(key)?;
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::from(e).into()),
        };
        let value = serde_json::from_slice(&data).map_err(CacheError::from)?;
        Ok(Some(value))
    }

    async fn set(&self, key: &str, value: &Value) -> anyhow::Result<()> {
        let target = self.document_path(key)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(CacheError::from)?;

        let data = serde_json::to_vec(value).map_err(CacheError::from)?;

        // Temp file in the same directory so the rename stays on one filesystem
        let tmp_path = self.dir.join(format!(".{key}.json.tmp"));
        debug!(?tmp_path, "writing to temporary file");
        tokio::fs::write(&tmp_path, &data)
            .await
            .map_err(CacheError::from)?;
        tokio::fs::rename(&tmp_path, &target)
            .await
            .map_err(CacheError::from)?;

        debug!(key, bytes = data.len(), "stored document");
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let path = self.document_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::from(e).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_path_rejects_traversal() {
        let store = FileKeyValueStore::new("/tmp/kv");
        assert!(store.document_path("../etc/passwd").is_err());
        assert!(store.document_path("").is_err());
        assert!(store.document_path(".hidden").is_err());
        assert_eq!(
            store.document_path("cachedBookmarks").unwrap(),
            PathBuf::from("/tmp/kv/cachedBookmarks.json")
        );
    }
}
