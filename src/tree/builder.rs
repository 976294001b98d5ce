//! Tree builder: walks a directory into ordered `TreeNode`s.
//!
//! Only the root can fail the build. Anything below it that cannot be read is
//! skipped and the walk continues with the next entry.

use super::node::{NodeKind, TreeNode};
use crate::config::{SortBy, SortDirection, TreeConfig};
use crate::error::TreeError;
use chrono::{DateTime, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;
use walkdir::WalkDir;

/// Build the tree below `root`. The returned nodes are the root's entries at depth 0.
pub fn build(root: &Path, config: &TreeConfig) -> Result<Vec<TreeNode>, TreeError> {
    TreeBuilder::new(root.to_path_buf(), config.clone()).build()
}

/// Run [`build`] on the blocking pool.
pub async fn build_async(root: PathBuf, config: TreeConfig) -> Result<Vec<TreeNode>, TreeError> {
    tokio::task::spawn_blocking(move || TreeBuilder::new(root, config).build())
        .await
        .map_err(|e| TreeError::Task(e.to_string()))?
}

/// Compile ignore globs into one matcher.
pub fn compile_globs(patterns: &[String]) -> Result<GlobSet, TreeError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| TreeError::InvalidGlob {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| TreeError::InvalidGlob {
        pattern: patterns.join(","),
        message: e.to_string(),
    })
}

pub struct TreeBuilder {
    root: PathBuf,
    config: TreeConfig,
}

/// Mutable state threaded through one walk.
struct Walk<'a> {
    root: &'a Path,
    config: &'a TreeConfig,
    globs: GlobSet,
    /// Real paths of directories already descended into
    visited: HashSet<PathBuf>,
    /// Gitignore matchers from the root down to the directory being listed
    gitignores: Vec<Gitignore>,
    skipped: usize,
}

struct Candidate {
    node: TreeNode,
    descend: bool,
    is_symlink: bool,
}

impl TreeBuilder {
    pub fn new(root: PathBuf, config: TreeConfig) -> Self {
        Self { root, config }
    }

    pub fn build(&self) -> Result<Vec<TreeNode>, TreeError> {
        let started = Instant::now();
        let metadata = std::fs::metadata(&self.root).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TreeError::RootMissing(self.root.clone())
            } else {
                TreeError::RootUnreadable {
                    path: self.root.clone(),
                    source: e,
                }
            }
        })?;
        if !metadata.is_dir() {
            return Err(TreeError::NotADirectory(self.root.clone()));
        }
        std::fs::read_dir(&self.root).map_err(|e| TreeError::RootUnreadable {
            path: self.root.clone(),
            source: e,
        })?;

        let mut walk = Walk {
            root: &self.root,
            config: &self.config,
            globs: compile_globs(&self.config.ignore_globs)?,
            visited: HashSet::new(),
            gitignores: Vec::new(),
            skipped: 0,
        };
        if let Ok(real_root) = dunce::canonicalize(&self.root) {
            walk.visited.insert(real_root);
        }

        let nodes = walk.list(&self.root, 0);
        debug!(
            root = %self.root.display(),
            top_level = nodes.len(),
            skipped = walk.skipped,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Built tree"
        );
        Ok(nodes)
    }
}

impl<'a> Walk<'a> {
    fn list(&mut self, dir: &Path, depth: usize) -> Vec<TreeNode> {
        let pushed = self.config.respect_gitignore && self.push_gitignore(dir);

        let mut candidates = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(dir = %dir.display(), error = %e, "Skipping unreadable entry");
                    self.skipped += 1;
                    continue;
                }
            };
            if let Some(candidate) = self.candidate(entry.path(), entry.path_is_symlink(), depth) {
                candidates.push(candidate);
            }
        }

        candidates.sort_by(|a, b| compare_nodes(&a.node, &b.node, self.config));

        let mut nodes = Vec::with_capacity(candidates.len());
        for mut candidate in candidates {
            if candidate.descend && self.enter(&candidate.node.path, candidate.is_symlink) {
                candidate.node.children = self.list(&candidate.node.path, depth + 1);
            }
            nodes.push(candidate.node);
        }

        if pushed {
            self.gitignores.pop();
        }
        nodes
    }

    fn candidate(&mut self, path: &Path, is_symlink: bool, depth: usize) -> Option<Candidate> {
        let name = path.file_name()?.to_string_lossy().into_owned();
        if name == ".git" {
            return None;
        }
        if !self.config.show_hidden && name.starts_with('.') {
            return None;
        }

        // Follows symlinks; a dangling link has no metadata and is dropped.
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Skipping entry without metadata");
                self.skipped += 1;
                return None;
            }
        };
        let is_dir = metadata.is_dir();

        if self.is_glob_ignored(path, &name) || self.is_git_ignored(path, is_dir) {
            return None;
        }

        let node = node_from_metadata(path, depth, &metadata);
        let within_depth = self.config.max_depth.map(|max| depth + 1 < max).unwrap_or(true);
        Some(Candidate {
            descend: is_dir && within_depth,
            is_symlink,
            node,
        })
    }

    /// Record a directory as visited; false when it must not be descended into.
    fn enter(&mut self, dir: &Path, is_symlink: bool) -> bool {
        let real = match dunce::canonicalize(dir) {
            Ok(real) => real,
            Err(e) => {
                debug!(path = %dir.display(), error = %e, "Cannot resolve directory");
                return false;
            }
        };
        let first_visit = self.visited.insert(real);
        if is_symlink && !first_visit {
            debug!(path = %dir.display(), "Not following symlink to visited directory");
            return false;
        }
        true
    }

    fn push_gitignore(&mut self, dir: &Path) -> bool {
        let file = dir.join(".gitignore");
        if !file.is_file() {
            return false;
        }
        let mut builder = GitignoreBuilder::new(dir);
        if let Some(e) = builder.add(&file) {
            debug!(path = %file.display(), error = %e, "Partially invalid .gitignore");
        }
        match builder.build() {
            Ok(gitignore) => {
                self.gitignores.push(gitignore);
                true
            }
            Err(e) => {
                debug!(path = %file.display(), error = %e, "Ignoring unreadable .gitignore");
                false
            }
        }
    }

    fn is_git_ignored(&self, path: &Path, is_dir: bool) -> bool {
        for gitignore in self.gitignores.iter().rev() {
            let matched = gitignore.matched(path, is_dir);
            if matched.is_ignore() {
                return true;
            }
            if matched.is_whitelist() {
                return false;
            }
        }
        false
    }

    fn is_glob_ignored(&self, path: &Path, name: &str) -> bool {
        if self.globs.is_empty() {
            return false;
        }
        let relative = path.strip_prefix(self.root).unwrap_or(path);
        self.globs.is_match(relative) || self.globs.is_match(name)
    }
}

fn node_from_metadata(path: &Path, depth: usize, metadata: &Metadata) -> TreeNode {
    let mut node = if metadata.is_dir() {
        TreeNode::directory(path, depth, Vec::new())
    } else {
        TreeNode::file(path, depth)
    };
    if node.kind == NodeKind::File {
        node.size = Some(metadata.len());
    }
    node.modified = metadata.modified().ok().map(DateTime::<Utc>::from);
    node
}

/// Sibling ordering. Directories lead when configured, regardless of direction, and
/// the name always breaks ties so equal keys still order deterministically.
pub fn compare_nodes(a: &TreeNode, b: &TreeNode, config: &TreeConfig) -> Ordering {
    if config.directories_first && a.is_dir() != b.is_dir() {
        return if a.is_dir() { Ordering::Less } else { Ordering::Greater };
    }
    let primary = match config.sort_by {
        SortBy::Name => Ordering::Equal,
        SortBy::Size => a.size.cmp(&b.size),
        SortBy::Modified => a.modified.cmp(&b.modified),
        SortBy::Type => extension(a).cmp(&extension(b)),
    };
    let ordering = primary.then_with(|| compare_names(&a.name, &b.name));
    match config.sort_direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

fn extension(node: &TreeNode) -> String {
    if node.is_dir() {
        return String::new();
    }
    Path::new(&node.name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
