//! Git status overlay onto tree snapshots.

use super::node::TreeNode;
use crate::git::GitStatusMap;
use std::sync::Arc;

/// Copy `tree` with each node's git status taken from `status` (absent means clean).
pub fn attach_git_status(tree: &[TreeNode], status: &GitStatusMap) -> Vec<TreeNode> {
    tree.iter()
        .map(|node| TreeNode {
            name: node.name.clone(),
            path: node.path.clone(),
            kind: node.kind,
            size: node.size,
            modified: node.modified,
            git_status: status.get(&node.path),
            children: attach_git_status(&node.children, status),
            depth: node.depth,
        })
        .collect()
}

/// Memoized [`attach_git_status`].
///
/// Inputs are immutable `Arc` snapshots, so pointer identity of both is the cache
/// signature. The inputs are retained so their allocations cannot be reused while
/// the entry is live.
#[derive(Default)]
pub struct StatusOverlay {
    last: Option<OverlayEntry>,
}

struct OverlayEntry {
    tree: Arc<Vec<TreeNode>>,
    status: Arc<GitStatusMap>,
    result: Arc<Vec<TreeNode>>,
}

impl StatusOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, tree: &Arc<Vec<TreeNode>>, status: &Arc<GitStatusMap>) -> Arc<Vec<TreeNode>> {
        if let Some(entry) = &self.last {
            if Arc::ptr_eq(&entry.tree, tree) && Arc::ptr_eq(&entry.status, status) {
                return Arc::clone(&entry.result);
            }
        }
        let result = if status.is_empty() {
            Arc::clone(tree)
        } else {
            Arc::new(attach_git_status(tree, status))
        };
        self.last = Some(OverlayEntry {
            tree: Arc::clone(tree),
            status: Arc::clone(status),
            result: Arc::clone(&result),
        });
        result
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
