//! Integration tests for the arbor tree view

mod cli_contracts;
mod engine_session;
mod flatten_properties;
mod support;
mod tree_filtering;
mod worktree_switch;
