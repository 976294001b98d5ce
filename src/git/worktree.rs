//! Worktree records and `git worktree list --porcelain` parsing.

use crate::paths::normalize_path;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A checkout sharing its repository with the others.
///
/// `id` is the normalized, symlink-resolved absolute path and stays stable across
/// listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Worktree {
    pub id: PathBuf,
    pub path: PathBuf,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<String>,
    pub is_current: bool,
    pub is_locked: bool,
}

impl Worktree {
    pub fn new(path: impl Into<PathBuf>, branch: Option<String>) -> Self {
        let path = path.into();
        let name = branch.clone().unwrap_or_else(|| {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned())
        });
        Self {
            id: normalize_path(&path),
            path,
            name,
            branch,
            head: None,
            is_current: false,
            is_locked: false,
        }
    }

    /// Match a user-supplied identifier against id, path, or name.
    pub fn matches(&self, key: &str) -> bool {
        let as_path = Path::new(key);
        self.name == key
            || self.path == as_path
            || self.id == as_path
            || (as_path.is_absolute() && self.id == normalize_path(as_path))
    }
}

/// Strip `refs/heads/`, `refs/remotes/` or `refs/tags/` from a ref name.
pub fn short_ref(reference: &str) -> &str {
    ["refs/heads/", "refs/remotes/", "refs/tags/"]
        .iter()
        .find_map(|prefix| reference.strip_prefix(prefix))
        .unwrap_or(reference)
}

/// Parse porcelain worktree listing. Bare entries have no checkout and are skipped.
pub fn parse_worktree_list(output: &str) -> Vec<Worktree> {
    let mut worktrees = Vec::new();
    for block in output.split("\n\n") {
        let mut path = None;
        let mut branch = None;
        let mut head = None;
        let mut bare = false;
        let mut locked = false;
        for line in block.lines() {
            let (key, value) = line.split_once(' ').unwrap_or((line, ""));
            match key {
                "worktree" => path = Some(PathBuf::from(value)),
                "HEAD" => head = Some(value.to_string()),
                "branch" => branch = Some(short_ref(value).to_string()),
                "bare" => bare = true,
                "locked" => locked = true,
                _ => {}
            }
        }
        let Some(path) = path else { continue };
        if bare {
            continue;
        }
        let mut worktree = Worktree::new(path, branch);
        worktree.head = head;
        worktree.is_locked = locked;
        worktrees.push(worktree);
    }
    worktrees
}

/// Flag the worktree containing `root` as current. The deepest match wins so a
/// worktree nested inside another resolves to itself.
pub fn mark_current(worktrees: &mut [Worktree], root: &Path) {
    let root = normalize_path(root);
    let current = worktrees
        .iter()
        .enumerate()
        .filter(|(_, w)| root.starts_with(&w.id))
        .max_by_key(|(_, w)| w.id.components().count())
        .map(|(index, _)| index);
    for (index, worktree) in worktrees.iter_mut().enumerate() {
        worktree.is_current = Some(index) == current;
    }
}
