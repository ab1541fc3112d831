//! Chromium bookmarks file tree provider
//!
//! Implements [`ITreeProvider`] over the JSON `Bookmarks` file that Chromium
//! based browsers keep in each profile directory:
//!
//! ```text
//! { "roots": { "bookmark_bar": {..}, "other": {..}, "synced": {..} }, "version": 1 }
//! ```
//!
//! Every node carries `id`, `name`, `type` (`folder` or `url`) and
//! `date_added` in WebKit microseconds (since 1601-01-01). The provider
//! rebuilds the browser's in-memory shape: a synthetic root with id
//! [`ROOT_NODE_ID`] whose children are the three roots.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use serde::Deserialize;
use tracing::debug;

use markwatch_core::domain::{TreeNode, ROOT_NODE_ID};
use markwatch_core::ports::{ITreeObserver, ITreeProvider, WatchHandle};

use crate::watcher::watch_file;
use crate::SyncError;

/// Milliseconds between 1601-01-01 and 1970-01-01
const WEBKIT_EPOCH_OFFSET_MS: i64 = 11_644_473_600_000;

// ============================================================================
// File format
// ============================================================================

#[derive(Debug, Deserialize)]
struct BookmarksFile {
    roots: Roots,
}

#[derive(Debug, Deserialize)]
struct Roots {
    bookmark_bar: Option<RawNode>,
    other: Option<RawNode>,
    synced: Option<RawNode>,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    #[serde(default)]
    id: String,
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    url: Option<String>,
    date_added: Option<RawTimestamp>,
    children: Option<Vec<RawNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Number(i64),
}

/// Converts WebKit microseconds to ms since the Unix epoch; `0` means unknown
fn webkit_to_unix_ms(raw: &RawTimestamp) -> Option<i64> {
    let micros = match raw {
        RawTimestamp::Text(text) => text.trim().parse::<i64>().ok()?,
        RawTimestamp::Number(n) => *n,
    };
    (micros > 0).then(|| micros / 1_000 - WEBKIT_EPOCH_OFFSET_MS)
}

impl RawNode {
    fn is_folder(&self) -> bool {
        match self.kind.as_deref() {
            Some("folder") => true,
            Some("url") => false,
            _ => self.children.is_some(),
        }
    }

    fn into_tree_node(self, parent_id: &str) -> TreeNode {
        let is_folder = self.is_folder();
        let date_added = self.date_added.as_ref().and_then(webkit_to_unix_ms);
        let children = if is_folder {
            let id = self.id.clone();
            Some(
                self.children
                    .unwrap_or_default()
                    .into_iter()
                    .map(|child| child.into_tree_node(&id))
                    .collect(),
            )
        } else {
            None
        };

        TreeNode {
            id: self.id,
            parent_id: Some(parent_id.to_string()),
            title: self.name,
            url: if is_folder {
                None
            } else {
                self.url.filter(|url| !url.is_empty())
            },
            date_added,
            children,
        }
    }
}

/// Parses the contents of a Chromium `Bookmarks` file into a forest
///
/// # Errors
/// Returns [`SyncError::MalformedBookmarks`] if `data` is not valid
/// bookmarks JSON.
pub fn parse_bookmarks(path: &Path, data: &str) -> Result<Vec<TreeNode>, SyncError> {
    let file: BookmarksFile =
        serde_json::from_str(data).map_err(|e| SyncError::MalformedBookmarks {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let roots = [file.roots.bookmark_bar, file.roots.other, file.roots.synced]
        .into_iter()
        .flatten()
        .map(|root| root.into_tree_node(ROOT_NODE_ID))
        .collect();

    Ok(vec![TreeNode {
        id: ROOT_NODE_ID.to_string(),
        parent_id: None,
        title: Some(String::new()),
        url: None,
        date_added: None,
        children: Some(roots),
    }])
}

// ============================================================================
// BookmarkFileProvider
// ============================================================================

/// Reads the bookmark tree from a Chromium profile's `Bookmarks` file
#[derive(Debug, Clone)]
pub struct BookmarkFileProvider {
    path: PathBuf,
}

impl BookmarkFileProvider {
    /// Creates a provider for the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the bookmarks file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl ITreeProvider for BookmarkFileProvider {
    async fn get_tree(&self) -> anyhow::Result<Vec<TreeNode>> {
        let data = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(SyncError::from)
            .with_context(|| format!("Failed to read bookmarks file {}", self.path.display()))?;
        let tree = parse_bookmarks(&self.path, &data)?;
        debug!(path = %self.path.display(), bytes = data.len(), "Read bookmarks file");
        Ok(tree)
    }

    async fn watch(&self, observer: Arc<dyn ITreeObserver>) -> anyhow::Result<WatchHandle> {
        Ok(watch_file(&self.path, observer)?)
    }
}
