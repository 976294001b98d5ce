//! Git access seam.

use super::status::{parse_porcelain_z, GitStatusMap};
use super::worktree::{mark_current, parse_worktree_list, Worktree};
use crate::error::GitError;
use crate::paths::normalize_path;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Source of repository state. The cache and the switch coordinator only see this
/// trait, so tests substitute scripted providers.
#[async_trait]
pub trait GitProvider: Send + Sync {
    /// Whether `root` lies inside a git working tree.
    async fn is_repository(&self, root: &Path) -> Result<bool, GitError>;

    /// Status of every changed, untracked or ignored path under `root`, keyed by
    /// absolute paths rooted at `root` as given.
    async fn status(&self, root: &Path) -> Result<GitStatusMap, GitError>;

    /// All non-bare worktrees of the repository containing `root`, with
    /// `is_current` set for the one containing `root`.
    async fn list_worktrees(&self, root: &Path) -> Result<Vec<Worktree>, GitError>;
}

/// Provider backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    binary: PathBuf,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("git"),
        }
    }
}

impl GitCli {
    pub fn new() -> Self {
        Self::default()
    }

    async fn run(&self, dir: &Path, args: &[&str]) -> Result<String, GitError> {
        debug!(dir = %dir.display(), args = ?args, "Running git");
        let output = Command::new(&self.binary)
            .arg("-C")
            .arg(dir)
            .args(args)
            .env("GIT_OPTIONAL_LOCKS", "0")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| GitError::Spawn(e.to_string()))?;
        if !output.status.success() {
            return Err(GitError::Command {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl GitProvider for GitCli {
    async fn is_repository(&self, root: &Path) -> Result<bool, GitError> {
        match self.run(root, &["rev-parse", "--is-inside-work-tree"]).await {
            Ok(out) => Ok(out.trim() == "true"),
            Err(GitError::Command { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn status(&self, root: &Path) -> Result<GitStatusMap, GitError> {
        let toplevel = self.run(root, &["rev-parse", "--show-toplevel"]).await?;
        let toplevel = normalize_path(Path::new(toplevel.trim()));
        let output = self
            .run(
                root,
                &["status", "--porcelain=v1", "-z", "--untracked-files=all", "--ignored"],
            )
            .await?;
        parse_porcelain_z(&output, &toplevel, &normalize_path(root), root)
    }

    async fn list_worktrees(&self, root: &Path) -> Result<Vec<Worktree>, GitError> {
        let output = self.run(root, &["worktree", "list", "--porcelain"]).await?;
        let mut worktrees = parse_worktree_list(&output);
        mark_current(&mut worktrees, root);
        Ok(worktrees)
    }
}
