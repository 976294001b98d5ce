//! Git integration: per-file status, worktree discovery, and the status cache.

mod cache;
mod provider;
mod status;
mod worktree;

pub use cache::{CachePhase, FetchOutcome, GitSnapshot, GitStatusCache};
pub use provider::{GitCli, GitProvider};
pub use status::{parse_porcelain_z, GitFileStatus, GitStatusMap};
pub use worktree::{mark_current, parse_worktree_list, short_ref, Worktree};
