//! Published view state.

use crate::activity::ActivityEvent;
use crate::git::{CachePhase, GitStatusMap, Worktree};
use crate::tree::FlattenedNode;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// User-facing message about something that did not block the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone)]
pub struct ViewSnapshot {
    /// Increases with every publish.
    pub revision: u64,
    pub root: PathBuf,
    pub rows: Arc<Vec<FlattenedNode>>,
    pub selected: Option<PathBuf>,
    pub selected_index: Option<usize>,
    pub filter: Option<String>,
    pub git_enabled: bool,
    pub git_phase: CachePhase,
    pub git_error: Option<String>,
    pub git_status: Arc<GitStatusMap>,
    pub worktrees: Vec<Worktree>,
    pub recent_activity: Vec<ActivityEvent>,
    pub notices: Vec<Notice>,
    pub watching: bool,
}

impl ViewSnapshot {
    pub fn empty(root: PathBuf) -> Self {
        Self {
            revision: 0,
            root,
            rows: Arc::new(Vec::new()),
            selected: None,
            selected_index: None,
            filter: None,
            git_enabled: false,
            git_phase: CachePhase::Idle,
            git_error: None,
            git_status: Arc::new(GitStatusMap::new()),
            worktrees: Vec::new(),
            recent_activity: Vec::new(),
            notices: Vec::new(),
            watching: false,
        }
    }

    pub fn selected_row(&self) -> Option<&FlattenedNode> {
        self.selected_index.and_then(|index| self.rows.get(index))
    }

    pub fn active_worktree(&self) -> Option<&Worktree> {
        self.worktrees.iter().find(|w| w.is_current)
    }
}
