//! Messages into and out of the engine.

use std::path::PathBuf;

/// Input accepted by the engine loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    /// Move the selection by a signed number of rows.
    Move(isize),
    /// Page down for a viewport of the given height.
    PageDown(usize),
    PageUp(usize),
    JumpStart,
    JumpEnd,
    /// Right arrow: expand a collapsed directory or open a file.
    Right,
    /// Left arrow: collapse, or step to the parent row.
    Left,
    /// Flip the expansion of the selected directory.
    Toggle,
    Select(PathBuf),
    /// Replace the name filter; `None` or a blank pattern clears it.
    SetFilter(Option<String>),
    /// Rebuild the tree and force a git status query now.
    Refresh,
    /// Switch to the worktree matching the key (id, path, or name).
    SwitchWorktree(String),
    SetGitEnabled(bool),
    ClearActivity,
    Shutdown,
}

impl EngineCommand {
    /// Commands that move the selection.
    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            EngineCommand::Move(_)
                | EngineCommand::PageDown(_)
                | EngineCommand::PageUp(_)
                | EngineCommand::JumpStart
                | EngineCommand::JumpEnd
                | EngineCommand::Select(_)
        )
    }
}

/// Requests the engine makes of its host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineIntent {
    /// The user asked to open a file.
    Open(PathBuf),
}
