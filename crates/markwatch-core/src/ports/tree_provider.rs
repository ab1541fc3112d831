//! Tree provider port (driven/secondary port)
//!
//! The source of truth for the user's bookmarks. The engine only ever asks
//! for a full snapshot; live mutation events carry no payload the engine
//! interprets, they merely signal "something changed".
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because fetch errors are adapter-specific.
//! - `ITreeObserver` uses synchronous callbacks, mirroring how browsers and
//!   filesystem watchers deliver events.

use std::sync::Arc;

use crate::domain::bookmark::TreeNode;

use super::watch::WatchHandle;

/// A live mutation reported by the tree provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeEvent {
    /// A bookmark or folder was created
    Created,
    /// A bookmark or folder was removed
    Removed,
    /// A title or URL changed
    Changed,
    /// A node moved to another folder or position
    Moved,
    /// A folder's children were reordered
    ChildrenReordered,
    /// A bulk import started
    ImportBegan,
    /// A bulk import finished
    ImportEnded,
}

/// Observer for tree mutation events
///
/// Callbacks may be invoked from a background thread, so implementations
/// must be thread-safe and must not block.
pub trait ITreeObserver: Send + Sync {
    /// Called once per mutation event
    fn on_tree_event(&self, event: TreeEvent);
}

/// Port trait for the bookmark tree source
#[async_trait::async_trait]
pub trait ITreeProvider: Send + Sync {
    /// Returns the complete current bookmark forest
    ///
    /// # Errors
    /// Returns an error if the snapshot cannot be obtained
    async fn get_tree(&self) -> anyhow::Result<Vec<TreeNode>>;

    /// Starts delivering mutation events to `observer`
    ///
    /// Returns a handle that stops delivery when dropped.
    async fn watch(&self, observer: Arc<dyn ITreeObserver>) -> anyhow::Result<WatchHandle>;
}
