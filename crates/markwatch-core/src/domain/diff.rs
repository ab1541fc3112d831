//! Identity-keyed snapshot diffing
//!
//! [`diff_bookmarks`] compares two flat lists by `id` only. Title, url and
//! path are payload: two records with different ids and the same URL are
//! independent bookmarks and are never merged.
//!
//! ## Output order
//!
//! 1. Walk the new list: unknown id → `add`; known id with a different
//!    path → `move`; known id, same path, different title or url → `edit`.
//! 2. Walk the old list: id missing from the new list → `delete`.
//!
//! A record whose path and title both changed yields a single `move`; the
//! title change is not reported separately, so each bookmark contributes at
//! most one record per diff.

use std::collections::HashMap;

use super::bookmark::BookmarkRecord;
use super::change::ChangeRecord;
use super::clock::Clock;

/// Diffs `old` against `new`, stamping each change with `clock`
pub fn diff_bookmarks(
    old: &[BookmarkRecord],
    new: &[BookmarkRecord],
    clock: &dyn Clock,
) -> Vec<ChangeRecord> {
    let old_by_id: HashMap<&str, &BookmarkRecord> =
        old.iter().map(|record| (record.id.as_str(), record)).collect();
    let new_by_id: HashMap<&str, &BookmarkRecord> =
        new.iter().map(|record| (record.id.as_str(), record)).collect();

    let mut changes = Vec::new();

    for current in new {
        let Some(previous) = old_by_id.get(current.id.as_str()) else {
            changes.push(ChangeRecord::Add {
                title: current.title.clone(),
                url: current.url.clone(),
                path: current.path.clone(),
                timestamp: clock.now_millis(),
            });
            continue;
        };

        if previous.path != current.path {
            changes.push(ChangeRecord::Move {
                title: current.title.clone(),
                url: current.url.clone(),
                old_path: previous.path.clone(),
                new_path: current.path.clone(),
                timestamp: clock.now_millis(),
            });
            continue;
        }

        if previous.title != current.title || previous.url != current.url {
            changes.push(ChangeRecord::Edit {
                old_title: previous.title.clone(),
                title: current.title.clone(),
                old_url: previous.url.clone(),
                url: current.url.clone(),
                path: current.path.clone(),
                timestamp: clock.now_millis(),
            });
        }
    }

    for previous in old {
        if !new_by_id.contains_key(previous.id.as_str()) {
            changes.push(ChangeRecord::Delete {
                title: previous.title.clone(),
                url: previous.url.clone(),
                folder: previous.path.clone(),
                timestamp: clock.now_millis(),
            });
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::change::ChangeAction;
    use crate::domain::clock::FixedClock;

    fn record(id: &str, title: &str, url: &str, path: &str) -> BookmarkRecord {
        BookmarkRecord::new(id, title, url, path)
    }

    #[test]
    fn test_add_from_empty() {
        let clock = FixedClock::new(123);
        let changes = diff_bookmarks(&[], &[record("1", "A", "u", "P")], &clock);
        assert_eq!(
            changes,
            vec![ChangeRecord::Add {
                title: "A".into(),
                url: "u".into(),
                path: "P".into(),
                timestamp: 123,
            }]
        );
    }

    #[test]
    fn test_path_change_is_move_not_edit() {
        let clock = FixedClock::new(1);
        let changes = diff_bookmarks(
            &[record("1", "A", "u", "P1")],
            &[record("1", "A", "u", "P2")],
            &clock,
        );
        assert_eq!(changes.len(), 1);
        match &changes[0] {
            ChangeRecord::Move {
                old_path, new_path, ..
            } => {
                assert_eq!(old_path, "P1");
                assert_eq!(new_path, "P2");
            }
            other => panic!("expected move, got {other:?}"),
        }
    }

    #[test]
    fn test_move_wins_over_simultaneous_title_change() {
        let clock = FixedClock::new(1);
        let changes = diff_bookmarks(
            &[record("1", "Old", "u", "P1")],
            &[record("1", "New", "u", "P2")],
            &clock,
        );
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].action(), ChangeAction::Move);
        assert_eq!(changes[0].title(), "New");
    }

    #[test]
    fn test_title_or_url_change_is_edit() {
        let clock = FixedClock::new(9);
        let changes = diff_bookmarks(
            &[record("1", "A", "u", "P")],
            &[record("1", "B", "u2", "P")],
            &clock,
        );
        assert_eq!(
            changes,
            vec![ChangeRecord::Edit {
                old_title: "A".into(),
                title: "B".into(),
                old_url: "u".into(),
                url: "u2".into(),
                path: "P".into(),
                timestamp: 9,
            }]
        );
    }

    #[test]
    fn test_missing_id_is_delete_with_folder() {
        let clock = FixedClock::new(1);
        let changes = diff_bookmarks(&[record("1", "A", "u", "P")], &[], &clock);
        assert_eq!(changes.len(), 1);
        match &changes[0] {
            ChangeRecord::Delete { folder, .. } => assert_eq!(folder, "P"),
            other => panic!("expected delete, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_urls_under_different_ids_are_independent() {
        let clock = FixedClock::new(1);
        let changes = diff_bookmarks(
            &[record("1", "A", "u", "P")],
            &[record("2", "A", "u", "P")],
            &clock,
        );
        let actions: Vec<_> = changes.iter().map(ChangeRecord::action).collect();
        assert_eq!(actions, vec![ChangeAction::Add, ChangeAction::Delete]);
    }

    #[test]
    fn test_duplicate_url_added_alongside_existing() {
        let clock = FixedClock::new(456);
        let changes = diff_bookmarks(
            &[record("1", "A", "u", "P")],
            &[record("1", "A", "u", "P"), record("2", "A2", "u", "P")],
            &clock,
        );
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].action(), ChangeAction::Add);
        assert_eq!(changes[0].url(), "u");
        assert_eq!(changes[0].timestamp(), 456);
    }

    #[test]
    fn test_self_diff_is_empty() {
        let clock = FixedClock::new(1);
        let list = vec![
            record("1", "A", "u", "P"),
            record("2", "B", "u", ""),
            record("3", "C", "v", "P > Q"),
        ];
        assert!(diff_bookmarks(&list, &list, &clock).is_empty());
    }

    #[test]
    fn test_reverse_diff_swaps_adds_and_deletes() {
        let clock = FixedClock::new(1);
        let a = vec![record("1", "A", "u", "P"), record("2", "B", "v", "P")];
        let b = vec![record("2", "B", "v", "P"), record("3", "C", "w", "Q")];

        let forward = diff_bookmarks(&a, &b, &clock);
        let backward = diff_bookmarks(&b, &a, &clock);

        let count = |changes: &[ChangeRecord], action: ChangeAction| {
            changes.iter().filter(|c| c.action() == action).count()
        };
        assert_eq!(
            count(&forward[..], ChangeAction::Add),
            count(&backward[..], ChangeAction::Delete)
        );
        assert_eq!(
            count(&forward[..], ChangeAction::Delete),
            count(&backward[..], ChangeAction::Add)
        );
        assert_eq!(forward[0].url(), "w");
        assert_eq!(backward[0].url(), "u");
    }

    #[test]
    fn test_order_is_new_list_then_deletes() {
        let clock = FixedClock::new(1);
        let old = vec![
            record("gone", "G", "g", "P"),
            record("moved", "M", "m", "P"),
            record("edited", "E", "e", "P"),
        ];
        let new = vec![
            record("fresh", "F", "f", "P"),
            record("edited", "E2", "e", "P"),
            record("moved", "M", "m", "Q"),
        ];
        let actions: Vec<_> = diff_bookmarks(&old, &new, &clock)
            .iter()
            .map(ChangeRecord::action)
            .collect();
        assert_eq!(
            actions,
            vec![
                ChangeAction::Add,
                ChangeAction::Edit,
                ChangeAction::Move,
                ChangeAction::Delete
            ]
        );
    }
}
