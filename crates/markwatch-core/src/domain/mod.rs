//! Domain entities and business logic
//!
//! This module contains the core domain types for markwatch:
//! - Bookmark tree nodes and flattened records
//! - Change records and their actions
//! - The pure flattening and diffing algorithms
//! - Storage keys with their defaults
//! - An injectable clock
//! - Domain-specific error types

pub mod bookmark;
pub mod change;
pub mod clock;
pub mod diff;
pub mod errors;
pub mod flatten;
pub mod storage;

// Re-export commonly used types
pub use bookmark::{BookmarkRecord, TreeNode, PATH_SEPARATOR, ROOT_NODE_ID};
pub use change::{ChangeAction, ChangeRecord};
pub use clock::{Clock, FixedClock, SystemClock};
pub use diff::diff_bookmarks;
pub use errors::DomainError;
pub use flatten::flatten_tree;
pub use storage::{StorageKey, DEFAULT_SYNC_INTERVAL_MINUTES, DEFAULT_THEME, KV_BOOKMARKS_KEY};
