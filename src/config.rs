//! Configuration
//!
//! Layered configuration for the tree, git, watch, activity, and logging concerns.
//! Every section deserializes with defaults, so a partial file only overrides the
//! keys it names.

mod loader;
pub mod paths;

pub use loader::ConfigLoader;

use crate::error::ArborError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sort key for sibling entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    Name,
    Size,
    Modified,
    Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// How aggressively a selection is carried across a worktree switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMatch {
    /// Absolute, then root-relative, then trailing-segment match.
    Suffix,
    /// Absolute, then root-relative match only.
    Relative,
}

/// Tree building and rebuild settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Include dot-files and dot-directories
    pub show_hidden: bool,
    /// Honour .gitignore files found while walking
    pub respect_gitignore: bool,
    /// Extra glob patterns excluded from the tree
    pub ignore_globs: Vec<String>,
    /// Number of levels included below the root (None = unlimited)
    pub max_depth: Option<usize>,
    pub sort_by: SortBy,
    pub sort_direction: SortDirection,
    pub directories_first: bool,
    /// Quiet period before filesystem activity triggers a rebuild
    pub rebuild_debounce_ms: u64,
    /// Longest a burst of activity can postpone a rebuild
    pub rebuild_max_wait_ms: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            show_hidden: false,
            respect_gitignore: true,
            ignore_globs: vec!["**/node_modules".to_string(), "**/.DS_Store".to_string()],
            max_depth: None,
            sort_by: SortBy::Name,
            sort_direction: SortDirection::Asc,
            directories_first: true,
            rebuild_debounce_ms: 150,
            rebuild_max_wait_ms: 1500,
        }
    }
}

impl TreeConfig {
    pub fn rebuild_debounce(&self) -> Duration {
        Duration::from_millis(self.rebuild_debounce_ms)
    }

    pub fn rebuild_max_wait(&self) -> Duration {
        Duration::from_millis(self.rebuild_max_wait_ms)
    }
}

/// Git status settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    pub enabled: bool,
    /// Trailing-edge debounce window for refresh requests
    pub debounce_ms: u64,
    /// Hard ceiling on how long continuous activity can delay a refresh
    pub max_wait_ms: u64,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 300,
            max_wait_ms: 2000,
        }
    }
}

impl GitConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }
}

/// Filesystem watcher settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub enabled: bool,
    /// Per-path coalescing window for raw notifications
    pub debounce_ms: u64,
    /// Glob patterns whose events are dropped before they reach the engine
    pub ignore_globs: Vec<String>,
}

impl WatchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 100,
            ignore_globs: vec![
                "**/.git/**".to_string(),
                "**/node_modules/**".to_string(),
                "**/target/**".to_string(),
                "**/*.swp".to_string(),
                "**/*.tmp".to_string(),
            ],
        }
    }
}

/// Recent activity buffer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityConfig {
    pub window_minutes: u64,
    pub max_entries: usize,
    /// Interval of the sweep that prunes entries while no events arrive
    pub sweep_interval_secs: u64,
}

impl ActivityConfig {
    pub fn window(&self) -> chrono::Duration {
        // Duration::minutes panics on overflow
        chrono::Duration::minutes(self.window_minutes.min(u32::MAX as u64) as i64)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            window_minutes: 5,
            max_entries: 50,
            sweep_interval_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorktreeConfig {
    pub selection_match: SelectionMatch,
}

impl Default for WorktreeConfig {
    fn default() -> Self {
        Self {
            selection_match: SelectionMatch::Suffix,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArborConfig {
    pub tree: TreeConfig,
    pub git: GitConfig,
    pub watch: WatchConfig,
    pub activity: ActivityConfig,
    pub worktree: WorktreeConfig,
    pub logging: LoggingConfig,
}

impl ArborConfig {
    /// Reject values the engine cannot operate with.
    pub fn validate(&self) -> Result<(), ArborError> {
        if self.activity.max_entries == 0 {
            return Err(ArborError::ConfigError(
                "activity.max_entries must be at least 1".to_string(),
            ));
        }
        if self.activity.window_minutes == 0 {
            return Err(ArborError::ConfigError(
                "activity.window_minutes must be at least 1".to_string(),
            ));
        }
        if self.tree.max_depth == Some(0) {
            return Err(ArborError::ConfigError(
                "tree.max_depth must be at least 1 when set".to_string(),
            ));
        }
        if self.git.max_wait_ms < self.git.debounce_ms {
            return Err(ArborError::ConfigError(format!(
                "git.max_wait_ms ({}) must not be below git.debounce_ms ({})",
                self.git.max_wait_ms, self.git.debounce_ms
            )));
        }
        Ok(())
    }
}
