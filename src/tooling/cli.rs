//! CLI Tooling
//!
//! Command-line interface for one-shot views of a workspace and a headless run of
//! the session engine.

use super::format::{
    format_activity_line, format_notice, format_status_text, format_tree_text,
    format_worktrees_text,
};
use crate::activity::ActivityEvent;
use crate::config::{ArborConfig, ConfigLoader};
use crate::engine::{Engine, EngineCommand, Notice, ViewSnapshot};
use crate::error::ArborError;
use crate::git::{mark_current, GitCli, GitProvider, GitStatusCache};
use crate::paths::normalize_path;
use crate::tree::{attach_git_status, build_async, directory_paths, filter_by_name, flatten};
use crate::watch::NotifyWatcherFactory;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Arbor CLI - live file tree with git status and worktree awareness
#[derive(Parser)]
#[command(name = "arbor")]
#[command(about = "Live view of a project's file tree with git status and worktree awareness")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the file tree with git status markers
    Tree {
        /// Expand every directory (default: top level only)
        #[arg(long)]
        expand_all: bool,
        /// Keep only entries fuzzy-matching the pattern
        #[arg(long)]
        filter: Option<String>,
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// List worktrees of the workspace repository
    Worktrees {
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Show git status for the workspace
    Status {
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Run the engine headless, printing activity until Ctrl-C
    Watch {
        /// Switch to this worktree (id, path, or name) after startup
        #[arg(long)]
        switch_to: Option<String>,
    },
}

/// CLI context for executing commands
pub struct CliContext {
    workspace_root: PathBuf,
    config: ArborConfig,
    provider: Arc<dyn GitProvider>,
}

impl CliContext {
    /// Create a new CLI context
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ArborError> {
        let config = match &config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        Ok(Self::with_config(workspace_root, config, Arc::new(GitCli::new())))
    }

    /// Context with an already loaded configuration and a chosen git provider.
    pub fn with_config(
        workspace_root: PathBuf,
        config: ArborConfig,
        provider: Arc<dyn GitProvider>,
    ) -> Self {
        Self {
            workspace_root: normalize_path(&workspace_root),
            config,
            provider,
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn config(&self) -> &ArborConfig {
        &self.config
    }

    /// Execute a CLI command
    pub async fn execute(&self, command: &Commands) -> Result<String, ArborError> {
        match command {
            Commands::Tree {
                expand_all,
                filter,
                format,
            } => self.handle_tree(*expand_all, filter.as_deref(), *format).await,
            Commands::Worktrees { format } => self.handle_worktrees(*format).await,
            Commands::Status { format } => self.handle_status(*format).await,
            Commands::Watch { switch_to } => self.handle_watch(switch_to.clone()).await,
        }
    }

    async fn handle_tree(
        &self,
        expand_all: bool,
        filter: Option<&str>,
        format: OutputFormat,
    ) -> Result<String, ArborError> {
        let tree = build_async(self.workspace_root.clone(), self.config.tree.clone()).await?;
        let cache = GitStatusCache::from_config(Arc::clone(&self.provider), &self.config.git);
        let outcome = cache.fetch(&self.workspace_root, true).await;
        let mut tree = attach_git_status(&tree, &outcome.map);
        let filter = filter.map(str::trim).filter(|p| !p.is_empty());
        if let Some(pattern) = filter {
            tree = filter_by_name(&tree, pattern);
        }

        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&json!({
                "root": self.workspace_root,
                "git_enabled": outcome.enabled,
                "nodes": tree,
            }))?),
            OutputFormat::Text => {
                let expanded: HashSet<PathBuf> = if expand_all || filter.is_some() {
                    directory_paths(&tree).into_iter().collect()
                } else {
                    HashSet::new()
                };
                let rows = flatten(&tree, &expanded);
                if rows.is_empty() {
                    return Ok("(empty)".to_string());
                }
                Ok(format!(
                    "{}\n{}",
                    self.workspace_root.display(),
                    format_tree_text(&rows).trim_end()
                ))
            }
        }
    }

    async fn handle_worktrees(&self, format: OutputFormat) -> Result<String, ArborError> {
        let mut worktrees = self.provider.list_worktrees(&self.workspace_root).await?;
        mark_current(&mut worktrees, &self.workspace_root);
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&worktrees)?),
            OutputFormat::Text => Ok(format_worktrees_text(&worktrees)),
        }
    }

    async fn handle_status(&self, format: OutputFormat) -> Result<String, ArborError> {
        let cache = GitStatusCache::from_config(Arc::clone(&self.provider), &self.config.git);
        let outcome = cache.fetch(&self.workspace_root, true).await;
        match format {
            OutputFormat::Json => {
                let entries: Vec<_> = outcome
                    .map
                    .sorted()
                    .into_iter()
                    .map(|(path, status)| {
                        json!({
                            "path": path.strip_prefix(&self.workspace_root).unwrap_or(path),
                            "status": status,
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&json!({
                    "root": self.workspace_root,
                    "enabled": outcome.enabled,
                    "entries": entries,
                }))?)
            }
            OutputFormat::Text => Ok(format_status_text(
                &self.workspace_root,
                &outcome.map,
                outcome.enabled,
            )
            .trim_end()
            .to_string()),
        }
    }

    async fn handle_watch(&self, switch_to: Option<String>) -> Result<String, ArborError> {
        let (mut handle, task) = Engine::spawn(
            self.workspace_root.clone(),
            self.config.clone(),
            Arc::clone(&self.provider),
            Arc::new(NotifyWatcherFactory::new()),
        );
        info!(root = %self.workspace_root.display(), "Watching workspace");
        if let Some(key) = switch_to {
            handle.send(EngineCommand::SwitchWorktree(key)).await?;
        }

        let mut printer = WatchPrinter::default();
        printer.print(&handle.view());
        loop {
            let interrupted = tokio::select! {
                _ = tokio::signal::ctrl_c() => true,
                view = handle.changed() => match view {
                    Some(view) => {
                        printer.print(&view);
                        false
                    }
                    None => break,
                },
            };
            if interrupted {
                // The engine may already be gone; shutdown is best-effort.
                let _ = handle.send(EngineCommand::Shutdown).await;
                break;
            }
        }
        drop(handle);
        if let Err(e) = task.await {
            warn!(error = %e, "Engine task ended abnormally");
        }
        Ok("Watch stopped".to_string())
    }
}

/// Prints what changed between successive snapshots.
#[derive(Default)]
struct WatchPrinter {
    root: Option<PathBuf>,
    rows: usize,
    changes: usize,
    git_enabled: Option<bool>,
    newest: Option<ActivityEvent>,
    notices: Vec<Notice>,
}

impl WatchPrinter {
    fn print(&mut self, view: &ViewSnapshot) {
        for line in self.lines(view) {
            println!("{}", line);
        }
    }

    fn lines(&mut self, view: &ViewSnapshot) -> Vec<String> {
        let mut lines = Vec::new();
        if self.root.as_deref() != Some(view.root.as_path()) {
            lines.push(format!("watching {}", view.root.display()));
            self.root = Some(view.root.clone());
            self.newest = None;
        }

        let fresh: Vec<&ActivityEvent> = view
            .recent_activity
            .iter()
            .take_while(|event| Some(*event) != self.newest.as_ref())
            .collect();
        for event in fresh.iter().rev() {
            lines.push(format_activity_line(event));
        }
        self.newest = view.recent_activity.first().cloned();

        for notice in view.notices.iter().filter(|n| !self.notices.contains(n)) {
            lines.push(format_notice(notice));
        }
        self.notices = view.notices.clone();

        let changes = view.git_status.len();
        if self.rows != view.rows.len()
            || self.changes != changes
            || self.git_enabled != Some(view.git_enabled)
        {
            self.rows = view.rows.len();
            self.changes = changes;
            self.git_enabled = Some(view.git_enabled);
            lines.push(format!(
                "{} rows, git {}, {} changed paths",
                self.rows,
                if view.git_enabled { "on" } else { "off" },
                changes
            ));
        }
        lines
    }
}
