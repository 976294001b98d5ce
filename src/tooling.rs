//! Tooling & Integration Layer
//!
//! Command-line front end and the text formatting it shares with headless runs.

pub mod cli;
pub mod format;

pub use cli::{Cli, CliContext, Commands, OutputFormat};
