//! Virtualizer: flattens the node tree into render-ready rows.

use super::node::{NodeKind, TreeNode};
use crate::git::GitFileStatus;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One visible row.
///
/// `is_last_sibling_at_depth[d]` tells whether the ancestor at depth `d` is the last
/// child of its own parent; it has exactly `depth` entries. Rows that share a parent
/// share the same slice.
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedNode {
    pub name: String,
    pub path: PathBuf,
    pub kind: NodeKind,
    pub depth: usize,
    pub size: Option<u64>,
    pub modified: Option<DateTime<Utc>>,
    pub git_status: Option<GitFileStatus>,
    pub has_children: bool,
    pub expanded: bool,
    pub is_last_sibling: bool,
    pub is_last_sibling_at_depth: Arc<[bool]>,
}

impl FlattenedNode {
    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    /// Tree-guide connector drawn left of the row's name.
    pub fn guide_prefix(&self) -> String {
        let mut prefix = String::with_capacity((self.depth + 1) * 4);
        for &ancestor_last in self.is_last_sibling_at_depth.iter() {
            prefix.push_str(if ancestor_last { "   " } else { "│  " });
        }
        prefix.push_str(if self.is_last_sibling { "└─ " } else { "├─ " });
        prefix
    }
}

/// Pre-order flatten. Directories always appear; their children only when the
/// directory's path is in `expanded`.
pub fn flatten(tree: &[TreeNode], expanded: &HashSet<PathBuf>) -> Vec<FlattenedNode> {
    let mut rows = Vec::new();
    let root_prefix: Arc<[bool]> = Arc::from(Vec::new());
    push_level(tree, expanded, &root_prefix, &mut rows);
    rows
}

fn push_level(
    nodes: &[TreeNode],
    expanded: &HashSet<PathBuf>,
    ancestors: &Arc<[bool]>,
    rows: &mut Vec<FlattenedNode>,
) {
    let last = nodes.len().saturating_sub(1);
    for (index, node) in nodes.iter().enumerate() {
        let is_last = index == last;
        let is_expanded = node.is_dir() && expanded.contains(&node.path);
        rows.push(FlattenedNode {
            name: node.name.clone(),
            path: node.path.clone(),
            kind: node.kind,
            depth: node.depth,
            size: node.size,
            modified: node.modified,
            git_status: node.git_status,
            has_children: node.has_children(),
            expanded: is_expanded,
            is_last_sibling: is_last,
            is_last_sibling_at_depth: Arc::clone(ancestors),
        });
        if is_expanded && node.has_children() {
            let mut prefix = Vec::with_capacity(ancestors.len() + 1);
            prefix.extend_from_slice(ancestors);
            prefix.push(is_last);
            let child_prefix: Arc<[bool]> = Arc::from(prefix);
            push_level(&node.children, expanded, &child_prefix, rows);
        }
    }
}

/// Row index of `path`, if visible.
pub fn index_of(rows: &[FlattenedNode], path: &Path) -> Option<usize> {
    rows.iter().position(|row| row.path == path)
}
