//! Error types for the tree, git, watch, and switch layers.

use std::path::PathBuf;
use thiserror::Error;

/// Root-level failures of a tree build.
///
/// Per-entry failures (unreadable children, broken symlinks) never surface here;
/// the builder skips them and keeps walking.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("Root path does not exist: {0}")]
    RootMissing(PathBuf),

    #[error("Root path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Root path cannot be read: {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid ignore glob '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },

    #[error("Tree build task failed: {0}")]
    Task(String),
}

/// Failures talking to git.
#[derive(Debug, Clone, Error)]
pub enum GitError {
    #[error("Failed to launch git: {0}")]
    Spawn(String),

    #[error("git {command} failed: {stderr}")]
    Command { command: String, stderr: String },

    #[error("Unexpected git output: {0}")]
    Parse(String),
}

/// Filesystem watcher failures.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Failed to create watcher: {0}")]
    Create(String),

    #[error("Failed to watch {path}: {message}")]
    Watch { path: PathBuf, message: String },

    #[error("Invalid watch ignore glob '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },
}

/// Worktree switch failures.
#[derive(Debug, Error)]
pub enum SwitchError {
    #[error("Unknown worktree: {0}")]
    UnknownWorktree(String),

    #[error("Failed to build tree for worktree {path}: {source}")]
    Build {
        path: PathBuf,
        #[source]
        source: TreeError,
    },
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum ArborError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Switch(#[from] SwitchError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Engine is no longer running")]
    EngineStopped,

    #[error(transparent)]
    ConfigLoad(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
