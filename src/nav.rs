//! Keyboard navigation over flattened rows.
//!
//! Pure functions: they read the current rows and selection and return the next
//! selection or the action to take. Clamping never wraps.

use crate::tree::{find_node, FlattenedNode, TreeNode};
use std::path::{Path, PathBuf};

/// Outcome of the right arrow on the selected row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RightAction {
    Expand,
    Open,
    None,
}

/// Outcome of the left arrow on the selected row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeftAction {
    Collapse,
    SelectParent(PathBuf),
    None,
}

/// Move `delta` rows from `current`, clamped to the list. An unknown `current`
/// counts as row 0. Returns `None` only for an empty list.
pub fn move_selection(rows: &[FlattenedNode], current: Option<&Path>, delta: isize) -> Option<PathBuf> {
    if rows.is_empty() {
        return None;
    }
    let index = current
        .and_then(|path| rows.iter().position(|row| row.path == path))
        .unwrap_or(0);
    let last = rows.len() - 1;
    let target = if delta.is_negative() {
        index.saturating_sub(delta.unsigned_abs())
    } else {
        index.saturating_add(delta.unsigned_abs()).min(last)
    };
    Some(rows[target].path.clone())
}

pub fn jump_to_start(rows: &[FlattenedNode]) -> Option<PathBuf> {
    rows.first().map(|row| row.path.clone())
}

pub fn jump_to_end(rows: &[FlattenedNode]) -> Option<PathBuf> {
    rows.last().map(|row| row.path.clone())
}

pub fn right_arrow_action(node: Option<&FlattenedNode>) -> RightAction {
    match node {
        Some(node) if node.is_dir() && !node.expanded => RightAction::Expand,
        Some(node) if !node.is_dir() => RightAction::Open,
        _ => RightAction::None,
    }
}

/// Collapse an expanded directory, otherwise step to the parent row when the
/// parent is visible.
pub fn left_arrow_action(node: Option<&FlattenedNode>, rows: &[FlattenedNode]) -> LeftAction {
    let Some(node) = node else {
        return LeftAction::None;
    };
    if node.is_dir() && node.expanded {
        return LeftAction::Collapse;
    }
    match node.path.parent() {
        Some(parent) if rows.iter().any(|row| row.path == parent) => {
            LeftAction::SelectParent(parent.to_path_buf())
        }
        _ => LeftAction::None,
    }
}

/// Rows moved by page up/down for a viewport of `height` rows.
pub fn page_delta(height: usize) -> isize {
    isize::try_from(height.saturating_sub(1).max(1)).unwrap_or(isize::MAX)
}

/// Directories that must be expanded for `path` to be visible, outermost first.
/// Empty when `path` is not in the tree.
pub fn reveal_path(tree: &[TreeNode], path: &Path) -> Vec<PathBuf> {
    if find_node(tree, path).is_none() {
        return Vec::new();
    }
    let mut ancestors: Vec<PathBuf> = path
        .ancestors()
        .skip(1)
        .filter(|ancestor| find_node(tree, ancestor).map(|n| n.is_dir()).unwrap_or(false))
        .map(Path::to_path_buf)
        .collect();
    ancestors.reverse();
    ancestors
}
