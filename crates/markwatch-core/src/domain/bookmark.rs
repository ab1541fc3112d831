//! Bookmark tree nodes and flattened bookmark records
//!
//! A [`TreeNode`] is what a tree provider hands us: a forest of folders and
//! leaves. A [`BookmarkRecord`] is the flattened, comparable form produced
//! by [`flatten_tree`](super::flatten::flatten_tree). Records are never
//! mutated in place; every refresh builds a brand-new list.

use serde::{Deserialize, Serialize};

/// Identity of the synthetic root node every provider tree hangs off.
///
/// Folders whose parent is this node (e.g. "Bookmarks bar") start a new
/// path instead of extending one.
pub const ROOT_NODE_ID: &str = "0";

/// Separator between folder names in a [`BookmarkRecord::path`].
pub const PATH_SEPARATOR: &str = " > ";

// ============================================================================
// BookmarkRecord
// ============================================================================

/// A single bookmark leaf, flattened out of the tree
///
/// `id` is the only identity used for diffing; `title`, `url` and `path`
/// are the payload compared between snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkRecord {
    /// Stable provider-assigned identifier
    pub id: String,
    /// Display title (may be empty)
    #[serde(default)]
    pub title: String,
    /// Target URL
    #[serde(default)]
    pub url: String,
    /// Folder breadcrumb joined with [`PATH_SEPARATOR`]; empty means root
    #[serde(default)]
    pub path: String,
    /// Creation time in milliseconds since the Unix epoch, if the provider knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_added: Option<i64>,
}

impl BookmarkRecord {
    /// Creates a record with no creation timestamp
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            path: path.into(),
            date_added: None,
        }
    }

    /// Sets the creation timestamp (ms epoch)
    #[must_use]
    pub fn with_date_added(mut self, date_added: i64) -> Self {
        self.date_added = Some(date_added);
        self
    }
}

// ============================================================================
// TreeNode
// ============================================================================

/// A node of the provider's bookmark forest
///
/// A node with `children` (even an empty list) is a folder; a node without
/// children is a leaf and is expected to carry a `url`. Leaves without a URL
/// are malformed and skipped during flattening.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    /// Provider-assigned identifier
    pub id: String,
    /// Identifier of the containing folder ([`ROOT_NODE_ID`] for top-level containers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Folder name or bookmark title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Bookmark URL (leaves only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Creation time in milliseconds since the Unix epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_added: Option<i64>,
    /// Child nodes (folders only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
}

impl TreeNode {
    /// Creates a folder node
    pub fn folder(
        id: impl Into<String>,
        parent_id: Option<&str>,
        title: impl Into<String>,
        children: Vec<TreeNode>,
    ) -> Self {
        Self {
            id: id.into(),
            parent_id: parent_id.map(str::to_string),
            title: Some(title.into()),
            url: None,
            date_added: None,
            children: Some(children),
        }
    }

    /// Creates a bookmark leaf node
    pub fn bookmark(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            title: Some(title.into()),
            url: Some(url.into()),
            date_added: None,
            children: None,
        }
    }

    /// Sets the parent identifier
    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Sets the creation timestamp (ms epoch)
    #[must_use]
    pub fn with_date_added(mut self, date_added: i64) -> Self {
        self.date_added = Some(date_added);
        self
    }

    /// Returns true if this node is a folder
    pub fn is_folder(&self) -> bool {
        self.children.is_some()
    }

    /// Returns true if this folder hangs directly off the synthetic root
    pub fn is_top_level(&self) -> bool {
        self.parent_id.as_deref() == Some(ROOT_NODE_ID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_json_uses_camel_case() {
        let record = BookmarkRecord::new("1", "Rust", "https://rust-lang.org", "Bar")
            .with_date_added(1_700_000_000_000);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["dateAdded"], 1_700_000_000_000i64);
        assert_eq!(json["path"], "Bar");
    }

    #[test]
    fn test_record_tolerates_missing_fields() {
        let record: BookmarkRecord = serde_json::from_str(r#"{"id":"7","url":"u"}"#).unwrap();
        assert_eq!(record.title, "");
        assert_eq!(record.path, "");
        assert_eq!(record.date_added, None);
    }

    #[test]
    fn test_folder_and_leaf_detection() {
        let leaf = TreeNode::bookmark("2", "a", "u");
        let folder = TreeNode::folder("1", Some(ROOT_NODE_ID), "Bar", vec![leaf.clone()]);
        assert!(folder.is_folder());
        assert!(folder.is_top_level());
        assert!(!leaf.is_folder());
        assert!(!leaf.is_top_level());
    }

    #[test]
    fn test_empty_children_is_still_folder() {
        let folder = TreeNode::folder("1", None, "Empty", Vec::new());
        assert!(folder.is_folder());
    }
}
