//! Bookmarks file watching
//!
//! Wraps the `notify` crate to observe a single bookmarks file and report
//! every relevant filesystem event as a [`TreeEvent`].
//!
//! Browsers replace the file by writing a temporary sibling and renaming it
//! into place, which would orphan a watch placed on the file itself. The
//! watcher therefore observes the parent directory non-recursively and
//! filters events down to the target file name.
//!
//! ```text
//! inotify ──→ RecommendedWatcher ──→ map_notify_event ──→ ITreeObserver
//! ```

use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;

use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, error, info};

use markwatch_core::ports::{ITreeObserver, TreeEvent, WatchHandle};

use crate::SyncError;

/// Starts watching `file` and forwards its events to `observer`
///
/// Dropping the returned handle stops the watch.
///
/// # Errors
/// Returns [`SyncError::WatchFailed`] if the path has no parent directory or
/// the OS watcher cannot be created or attached.
pub fn watch_file(file: &Path, observer: Arc<dyn ITreeObserver>) -> Result<WatchHandle, SyncError> {
    let fail = |reason: String| SyncError::WatchFailed {
        path: file.to_path_buf(),
        reason,
    };

    let target = file
        .file_name()
        .map(|name| name.to_os_string())
        .ok_or_else(|| fail("path has no file name".to_string()))?;
    let dir = match file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };

    let mut watcher = RecommendedWatcher::new(
        move |res: std::result::Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                if let Some(tree_event) = map_notify_event(&event, &target) {
                    observer.on_tree_event(tree_event);
                }
            }
            Err(err) => {
                error!(error = %err, "Bookmarks file watcher error");
            }
        },
        notify::Config::default(),
    )
    .map_err(|e| fail(format!("failed to create watcher: {e}")))?;

    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .map_err(|e| fail(format!("failed to watch {}: {e}", dir.display())))?;

    info!(file = %file.display(), "Watching bookmarks file");

    let watched = file.to_path_buf();
    Ok(WatchHandle::new(move || {
        drop(watcher);
        debug!(file = %watched.display(), "Stopped watching bookmarks file");
    }))
}

/// Converts a `notify::Event` touching `file_name` into a [`TreeEvent`]
///
/// Maps the notify event kinds as follows:
/// - `Create(*)` -> `TreeEvent::Created`
/// - `Remove(*)` -> `TreeEvent::Removed`
/// - `Modify(Name(*))` -> `TreeEvent::Moved`
/// - Other `Modify(*)` -> `TreeEvent::Changed`
///
/// Returns `None` for events on other files and for access events.
pub fn map_notify_event(event: &notify::Event, file_name: &OsString) -> Option<TreeEvent> {
    let touches_file = event
        .paths
        .iter()
        .any(|path| path.file_name() == Some(file_name.as_os_str()));
    if !touches_file {
        return None;
    }

    let mapped = match &event.kind {
        EventKind::Create(_) => TreeEvent::Created,
        EventKind::Remove(_) => TreeEvent::Removed,
        EventKind::Modify(ModifyKind::Name(_)) => TreeEvent::Moved,
        EventKind::Modify(_) => TreeEvent::Changed,
        _ => {
            debug!(kind = ?event.kind, "Ignoring event kind");
            return None;
        }
    };
    debug!(kind = ?event.kind, ?mapped, "Mapped bookmarks file event");
    Some(mapped)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use notify::event::{AccessKind, CreateKind, DataChange, RemoveKind, RenameMode};

    use super::*;

    fn event(kind: EventKind, paths: &[&str]) -> notify::Event {
        let mut event = notify::Event::new(kind);
        for path in paths {
            event = event.add_path(PathBuf::from(path));
        }
        event
    }

    fn bookmarks() -> OsString {
        OsString::from("Bookmarks")
    }

    #[test]
    fn test_create_maps_to_created() {
        let e = event(EventKind::Create(CreateKind::File), &["/p/Bookmarks"]);
        assert_eq!(map_notify_event(&e, &bookmarks()), Some(TreeEvent::Created));
    }

    #[test]
    fn test_data_change_maps_to_changed() {
        let e = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/p/Bookmarks"],
        );
        assert_eq!(map_notify_event(&e, &bookmarks()), Some(TreeEvent::Changed));
    }

    #[test]
    fn test_rename_onto_target_maps_to_moved() {
        let e = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/p/Bookmarks.tmp", "/p/Bookmarks"],
        );
        assert_eq!(map_notify_event(&e, &bookmarks()), Some(TreeEvent::Moved));
    }

    #[test]
    fn test_remove_maps_to_removed() {
        let e = event(EventKind::Remove(RemoveKind::File), &["/p/Bookmarks"]);
        assert_eq!(map_notify_event(&e, &bookmarks()), Some(TreeEvent::Removed));
    }

    #[test]
    fn test_other_files_are_ignored() {
        let e = event(EventKind::Create(CreateKind::File), &["/p/History"]);
        assert_eq!(map_notify_event(&e, &bookmarks()), None);
    }

    #[test]
    fn test_access_events_are_ignored() {
        let e = event(EventKind::Access(AccessKind::Any), &["/p/Bookmarks"]);
        assert_eq!(map_notify_event(&e, &bookmarks()), None);
    }

    #[test]
    fn test_watch_missing_directory_fails() {
        struct Ignore;
        impl ITreeObserver for Ignore {
            fn on_tree_event(&self, _event: TreeEvent) {}
        }
        let result = watch_file(Path::new("/nonexistent/markwatch/Bookmarks"), Arc::new(Ignore));
        assert!(matches!(result, Err(SyncError::WatchFailed { .. })));
    }
}
