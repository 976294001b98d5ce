//! Arbor: a live, navigable view of a project's file tree
//!
//! Builds and flattens the workspace tree, overlays git status, follows the
//! filesystem through a watcher, and lets a session hop between git worktrees
//! while keeping its place. The [`engine`] module ties these together behind a
//! command channel and a published [`engine::ViewSnapshot`].

pub mod activity;
pub mod config;
pub mod debounce;
pub mod engine;
pub mod error;
pub mod git;
pub mod logging;
pub mod nav;
pub mod paths;
pub mod switch;
pub mod tooling;
pub mod tree;
pub mod watch;
