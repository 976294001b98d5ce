//! Per-file git status and `git status --porcelain=v1 -z` parsing.

use crate::error::GitError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Status of a single path. Clean paths have no entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GitFileStatus {
    Modified,
    Added,
    Deleted,
    Untracked,
    Ignored,
}

impl GitFileStatus {
    /// Single-character marker used by renderers.
    pub fn marker(self) -> char {
        match self {
            GitFileStatus::Modified => 'M',
            GitFileStatus::Added => 'A',
            GitFileStatus::Deleted => 'D',
            GitFileStatus::Untracked => '?',
            GitFileStatus::Ignored => '!',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GitFileStatus::Modified => "modified",
            GitFileStatus::Added => "added",
            GitFileStatus::Deleted => "deleted",
            GitFileStatus::Untracked => "untracked",
            GitFileStatus::Ignored => "ignored",
        }
    }

    /// Map a porcelain `XY` code. Conflicts count as modified, renames and copies as
    /// added at their destination.
    pub fn from_porcelain(x: char, y: char) -> Option<Self> {
        match (x, y) {
            ('?', '?') => Some(GitFileStatus::Untracked),
            ('!', '!') => Some(GitFileStatus::Ignored),
            _ if x == 'U' || y == 'U' => Some(GitFileStatus::Modified),
            _ if x == 'A' || y == 'A' => Some(GitFileStatus::Added),
            _ if x == 'D' || y == 'D' => Some(GitFileStatus::Deleted),
            _ if matches!(x, 'R' | 'C') || matches!(y, 'R' | 'C') => Some(GitFileStatus::Added),
            _ if matches!(x, 'M' | 'T') || matches!(y, 'M' | 'T') => Some(GitFileStatus::Modified),
            _ => None,
        }
    }
}

/// Absolute path to status, keyed the same way as tree node paths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GitStatusMap {
    entries: HashMap<PathBuf, GitFileStatus>,
}

impl GitStatusMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<GitFileStatus> {
        self.entries.get(path).copied()
    }

    pub fn insert(&mut self, path: PathBuf, status: GitFileStatus) {
        self.entries.insert(path, status);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &GitFileStatus)> {
        self.entries.iter()
    }

    /// Entries sorted by path, for stable output.
    pub fn sorted(&self) -> Vec<(&PathBuf, GitFileStatus)> {
        let mut entries: Vec<_> = self.entries.iter().map(|(p, s)| (p, *s)).collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

impl FromIterator<(PathBuf, GitFileStatus)> for GitStatusMap {
    fn from_iter<I: IntoIterator<Item = (PathBuf, GitFileStatus)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Parse NUL-separated porcelain v1 output.
///
/// Git reports paths relative to `repo_toplevel`; entries are re-rooted under
/// `workspace_root` (the path the tree was built from) and entries outside
/// `workspace_real` (the symlink-resolved workspace root) are dropped. Rename and
/// copy records carry a second field holding the source path, which is skipped.
pub fn parse_porcelain_z(
    output: &str,
    repo_toplevel: &Path,
    workspace_real: &Path,
    workspace_root: &Path,
) -> Result<GitStatusMap, GitError> {
    let mut map = GitStatusMap::new();
    let mut fields = output.split('\0');
    while let Some(record) = fields.next() {
        if record.is_empty() {
            continue;
        }
        let (code, path) = match (record.get(..2), record.get(3..)) {
            (Some(code), Some(path)) if !path.is_empty() => (code, path),
            _ => return Err(GitError::Parse(format!("malformed status record: {:?}", record))),
        };
        let mut chars = code.chars();
        let (x, y) = match (chars.next(), chars.next()) {
            (Some(x), Some(y)) => (x, y),
            _ => return Err(GitError::Parse(format!("malformed status code: {:?}", code))),
        };
        if matches!(x, 'R' | 'C') {
            fields.next();
        }
        let Some(status) = GitFileStatus::from_porcelain(x, y) else {
            continue;
        };
        let absolute = repo_toplevel.join(path.trim_end_matches('/'));
        if let Ok(inside) = absolute.strip_prefix(workspace_real) {
            map.insert(workspace_root.join(inside), status);
        }
    }
    Ok(map)
}
