//! Filesystem node types

use crate::git::GitFileStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Node kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Directory,
}

/// One filesystem entry.
///
/// `path` is absolute and unique across a tree. `children` is always empty for files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    pub path: PathBuf,
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_status: Option<GitFileStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
    pub depth: usize,
}

impl TreeNode {
    pub fn file(path: impl Into<PathBuf>, depth: usize) -> Self {
        Self::new(path.into(), NodeKind::File, depth)
    }

    pub fn directory(path: impl Into<PathBuf>, depth: usize, children: Vec<TreeNode>) -> Self {
        let mut node = Self::new(path.into(), NodeKind::Directory, depth);
        node.children = children;
        node
    }

    fn new(path: PathBuf, kind: NodeKind, depth: usize) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            name,
            path,
            kind,
            size: None,
            modified: None,
            git_status: None,
            children: Vec::new(),
            depth,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Depth-first search for a node by path.
pub fn find_node<'a>(nodes: &'a [TreeNode], path: &Path) -> Option<&'a TreeNode> {
    for node in nodes {
        if node.path == path {
            return Some(node);
        }
        if node.is_dir() && path.starts_with(&node.path) {
            if let Some(found) = find_node(&node.children, path) {
                return Some(found);
            }
        }
    }
    None
}

/// Visit every node in pre-order.
pub fn walk_nodes<'a>(nodes: &'a [TreeNode], visit: &mut dyn FnMut(&'a TreeNode)) {
    for node in nodes {
        visit(node);
        walk_nodes(&node.children, visit);
    }
}

/// Total node count across the tree.
pub fn count_nodes(nodes: &[TreeNode]) -> usize {
    nodes.iter().map(|n| 1 + count_nodes(&n.children)).sum()
}

/// Paths of every directory in the tree, in pre-order.
pub fn directory_paths(nodes: &[TreeNode]) -> Vec<PathBuf> {
    let mut out = Vec::new();
    walk_nodes(nodes, &mut |node| {
        if node.is_dir() {
            out.push(node.path.clone());
        }
    });
    out
}
