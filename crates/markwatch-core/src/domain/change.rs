//! Change records produced by the differ and kept in the history log
//!
//! A [`ChangeRecord`] is immutable once created. Its JSON form is tagged by
//! `action` (`add`, `move`, `edit`, `delete`) with camelCase fields, which
//! is also the form persisted under the `bookmarkHistory` storage key.
//! Records written by older releases used the action name `update`; those
//! decode as [`ChangeRecord::Edit`].

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use super::bookmark::PATH_SEPARATOR;

/// Separator used when building [`ChangeRecord::history_key`] (ASCII unit separator).
const KEY_SEPARATOR: &str = "\u{1F}";

// ============================================================================
// ChangeAction
// ============================================================================

/// The kind of a [`ChangeRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    /// A bookmark id appeared
    Add,
    /// A bookmark kept its id but changed folder
    Move,
    /// A bookmark kept its id and folder but changed title or url
    #[serde(alias = "update")]
    Edit,
    /// A bookmark id disappeared
    Delete,
}

impl ChangeAction {
    /// Returns the wire name of the action
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Add => "add",
            ChangeAction::Move => "move",
            ChangeAction::Edit => "edit",
            ChangeAction::Delete => "delete",
        }
    }
}

impl Display for ChangeAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ChangeRecord
// ============================================================================

/// One detected difference between two bookmark snapshots
///
/// Field population depends on the action:
///
/// | Action   | Fields                                          |
/// |----------|-------------------------------------------------|
/// | `add`    | title, url, path                                |
/// | `move`   | title, url, oldPath, newPath                    |
/// | `edit`   | oldTitle, title, oldUrl, url, path              |
/// | `delete` | title, url, folder (the old path)               |
///
/// Every variant carries a `timestamp` in milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ChangeRecord {
    #[serde(rename_all = "camelCase")]
    Add {
        #[serde(default)]
        title: String,
        #[serde(default)]
        url: String,
        #[serde(default)]
        path: String,
        #[serde(default)]
        timestamp: i64,
    },
    #[serde(rename_all = "camelCase")]
    Move {
        #[serde(default)]
        title: String,
        #[serde(default)]
        url: String,
        #[serde(default)]
        old_path: String,
        #[serde(default)]
        new_path: String,
        #[serde(default)]
        timestamp: i64,
    },
    #[serde(rename_all = "camelCase", alias = "update")]
    Edit {
        #[serde(default)]
        old_title: String,
        #[serde(default)]
        title: String,
        #[serde(default)]
        old_url: String,
        #[serde(default)]
        url: String,
        #[serde(default)]
        path: String,
        #[serde(default)]
        timestamp: i64,
    },
    #[serde(rename_all = "camelCase")]
    Delete {
        #[serde(default)]
        title: String,
        #[serde(default)]
        url: String,
        #[serde(default)]
        folder: String,
        #[serde(default)]
        timestamp: i64,
    },
}

impl ChangeRecord {
    /// Returns the action of this record
    pub fn action(&self) -> ChangeAction {
        match self {
            ChangeRecord::Add { .. } => ChangeAction::Add,
            ChangeRecord::Move { .. } => ChangeAction::Move,
            ChangeRecord::Edit { .. } => ChangeAction::Edit,
            ChangeRecord::Delete { .. } => ChangeAction::Delete,
        }
    }

    /// Returns when the change was detected (ms epoch)
    pub fn timestamp(&self) -> i64 {
        match self {
            ChangeRecord::Add { timestamp, .. }
            | ChangeRecord::Move { timestamp, .. }
            | ChangeRecord::Edit { timestamp, .. }
            | ChangeRecord::Delete { timestamp, .. } => *timestamp,
        }
    }

    /// Returns the current (or, for deletes, last known) title
    pub fn title(&self) -> &str {
        match self {
            ChangeRecord::Add { title, .. }
            | ChangeRecord::Move { title, .. }
            | ChangeRecord::Edit { title, .. }
            | ChangeRecord::Delete { title, .. } => title,
        }
    }

    /// Returns the current (or, for deletes, last known) URL
    pub fn url(&self) -> &str {
        match self {
            ChangeRecord::Add { url, .. }
            | ChangeRecord::Move { url, .. }
            | ChangeRecord::Edit { url, .. }
            | ChangeRecord::Delete { url, .. } => url,
        }
    }

    /// Returns the folder this record is filed under for export
    ///
    /// `path` for adds and edits, the destination for moves and the former
    /// folder for deletes.
    pub fn folder_path(&self) -> &str {
        match self {
            ChangeRecord::Add { path, .. } | ChangeRecord::Edit { path, .. } => path,
            ChangeRecord::Move { new_path, .. } => new_path,
            ChangeRecord::Delete { folder, .. } => folder,
        }
    }

    /// Splits [`folder_path`](Self::folder_path) into trimmed, non-empty folder names
    pub fn folder_segments(&self) -> Vec<&str> {
        self.folder_path()
            .split(PATH_SEPARATOR)
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .collect()
    }

    /// Builds a stable identity string for this entry
    ///
    /// Two records with the same key are indistinguishable history entries.
    /// Absent fields contribute an empty segment so keys line up across actions.
    pub fn history_key(&self) -> String {
        let (url, old_url, title, old_title, path, old_path, new_path, folder) = match self {
            ChangeRecord::Add {
                title, url, path, ..
            } => (url, "", title, "", path.as_str(), "", "", ""),
            ChangeRecord::Move {
                title,
                url,
                old_path,
                new_path,
                ..
            } => (url, "", title, "", "", old_path.as_str(), new_path.as_str(), ""),
            ChangeRecord::Edit {
                old_title,
                title,
                old_url,
                url,
                path,
                ..
            } => (
                url,
                old_url.as_str(),
                title,
                old_title.as_str(),
                path.as_str(),
                "",
                "",
                "",
            ),
            ChangeRecord::Delete {
                title, url, folder, ..
            } => (url, "", title, "", "", "", "", folder.as_str()),
        };

        let timestamp = self.timestamp().to_string();
        [
            timestamp.as_str(),
            self.action().as_str(),
            url.as_str(),
            old_url,
            title.as_str(),
            old_title,
            path,
            old_path,
            new_path,
            folder,
        ]
        .join(KEY_SEPARATOR)
    }
}
