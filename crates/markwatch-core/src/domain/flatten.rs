//! Tree flattening
//!
//! Converts a provider forest into the ordered flat list of leaf
//! [`BookmarkRecord`]s the differ works on. Pure: no I/O, no shared state.

use super::bookmark::{BookmarkRecord, TreeNode, PATH_SEPARATOR};

/// Flattens a bookmark forest into leaf records in pre-order
///
/// Path rules:
/// - a folder directly under the synthetic root (`parent_id == "0"`)
///   replaces the accumulated path with its own title;
/// - any other titled folder appends its title to the accumulated path;
/// - folders with an empty or missing title contribute nothing.
///
/// Leaves without a URL (or with an empty one) are malformed and skipped. Leaves without a title
/// are kept with an empty title.
pub fn flatten_tree(nodes: &[TreeNode]) -> Vec<BookmarkRecord> {
    let mut records = Vec::new();
    flatten_into(nodes, "", &mut records);
    records
}

fn flatten_into(nodes: &[TreeNode], parent_path: &str, records: &mut Vec<BookmarkRecord>) {
    for node in nodes {
        if let Some(children) = &node.children {
            let next_path = folder_path(node, parent_path);
            flatten_into(children, &next_path, records);
            continue;
        }

        let Some(url) = node.url.as_deref().filter(|url| !url.is_empty()) else {
            continue;
        };

        records.push(BookmarkRecord {
            id: node.id.clone(),
            title: node.title.clone().unwrap_or_default(),
            url: url.to_string(),
            path: parent_path.to_string(),
            date_added: node.date_added,
        });
    }
}

fn folder_path(folder: &TreeNode, parent_path: &str) -> String {
    match folder.title.as_deref() {
        Some(title) if !title.is_empty() => {
            if folder.is_top_level() || parent_path.is_empty() {
                title.to_string()
            } else {
                format!("{parent_path}{PATH_SEPARATOR}{title}")
            }
        }
        _ => parent_path.to_string(),
    }
}
