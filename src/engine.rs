//! Session Engine
//!
//! One task owns all session state: the tree snapshot, expansion set, selection,
//! filter, activity buffer, and the active watcher. Commands, watcher events,
//! debounce deadlines and background completions are handled one at a time in a
//! single `select!` loop, and each handled input publishes a fresh
//! [`ViewSnapshot`] when it changed anything. Tree builds and git queries run on
//! other tasks and report back as messages; each carries a generation so results
//! from before a switch or a newer build are dropped.

mod command;
mod view;

pub use command::{EngineCommand, EngineIntent};
pub use view::{Notice, NoticeLevel, ViewSnapshot};

use crate::activity::ActivityBuffer;
use crate::config::ArborConfig;
use crate::debounce::Debounce;
use crate::error::{ArborError, GitError, SwitchError, TreeError};
use crate::git::{mark_current, GitProvider, GitStatusCache, Worktree};
use crate::nav::{
    jump_to_end, jump_to_start, left_arrow_action, move_selection, page_delta, reveal_path,
    right_arrow_action, LeftAction, RightAction,
};
use crate::paths::normalize_path;
use crate::switch::switch_worktree;
use crate::tree::{
    build_async, directory_paths, filter_by_name, find_node, flatten, index_of, FlattenedNode,
    StatusOverlay, TreeNode,
};
use crate::watch::{EventSink, FsWatcher, WatchEvent, WatcherFactory};
use chrono::{DateTime, Utc};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

const MAX_NOTICES: usize = 8;
const COMMAND_BUFFER: usize = 64;

/// Client side of a running engine.
pub struct EngineHandle {
    commands: mpsc::Sender<EngineCommand>,
    view: watch::Receiver<ViewSnapshot>,
    intents: mpsc::UnboundedReceiver<EngineIntent>,
}

impl EngineHandle {
    pub async fn send(&self, command: EngineCommand) -> Result<(), ArborError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ArborError::EngineStopped)
    }

    /// Latest published snapshot.
    pub fn view(&self) -> ViewSnapshot {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewSnapshot> {
        self.view.clone()
    }

    /// Wait for the next publish. `None` once the engine has stopped.
    pub async fn changed(&mut self) -> Option<ViewSnapshot> {
        self.view.changed().await.ok()?;
        Some(self.view.borrow_and_update().clone())
    }

    pub async fn next_intent(&mut self) -> Option<EngineIntent> {
        self.intents.recv().await
    }
}

enum Internal {
    TreeBuilt {
        generation: u64,
        debounced: bool,
        result: Result<Vec<TreeNode>, TreeError>,
    },
    GitSettled,
    WorktreesLoaded {
        root: PathBuf,
        result: Result<Vec<Worktree>, GitError>,
    },
}

struct Inbox {
    commands: mpsc::Receiver<EngineCommand>,
    events: mpsc::UnboundedReceiver<WatchEvent>,
    internal: mpsc::UnboundedReceiver<Internal>,
}

pub struct Engine {
    config: ArborConfig,
    root: PathBuf,
    tree: Arc<Vec<TreeNode>>,
    tree_generation: u64,
    expanded: HashSet<PathBuf>,
    selected: Option<PathBuf>,
    /// Set when a switch found no counterpart for the selection; holds the
    /// selection empty until the user navigates.
    selection_cleared: bool,
    filter: Option<String>,
    rows: Arc<Vec<FlattenedNode>>,
    overlay: StatusOverlay,
    git: GitStatusCache,
    provider: Arc<dyn GitProvider>,
    worktrees: Vec<Worktree>,
    activity: ActivityBuffer,
    watcher: Option<Box<dyn FsWatcher>>,
    factory: Arc<dyn WatcherFactory>,
    sink: EventSink,
    rebuild: Debounce,
    notices: VecDeque<Notice>,
    revision: u64,
    clock: (Instant, DateTime<Utc>),
    internal: mpsc::UnboundedSender<Internal>,
    intents: mpsc::UnboundedSender<EngineIntent>,
    view: watch::Sender<ViewSnapshot>,
    inbox: Option<Inbox>,
}

impl Engine {
    pub fn new(
        root: PathBuf,
        config: ArborConfig,
        provider: Arc<dyn GitProvider>,
        factory: Arc<dyn WatcherFactory>,
    ) -> (Self, EngineHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (sink, events) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (intent_tx, intent_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(ViewSnapshot::empty(root.clone()));

        let engine = Self {
            git: GitStatusCache::from_config(Arc::clone(&provider), &config.git),
            activity: ActivityBuffer::from_config(root.clone(), &config.activity),
            rebuild: Debounce::new(config.tree.rebuild_debounce(), config.tree.rebuild_max_wait()),
            config,
            root,
            tree: Arc::new(Vec::new()),
            tree_generation: 0,
            expanded: HashSet::new(),
            selected: None,
            selection_cleared: false,
            filter: None,
            rows: Arc::new(Vec::new()),
            overlay: StatusOverlay::new(),
            provider,
            worktrees: Vec::new(),
            watcher: None,
            factory,
            sink,
            notices: VecDeque::new(),
            revision: 0,
            clock: (Instant::now(), Utc::now()),
            internal: internal_tx,
            intents: intent_tx,
            view: view_tx,
            inbox: Some(Inbox {
                commands: command_rx,
                events,
                internal: internal_rx,
            }),
        };
        let handle = EngineHandle {
            commands: command_tx,
            view: view_rx,
            intents: intent_rx,
        };
        (engine, handle)
    }

    /// Create an engine and run it on its own task.
    pub fn spawn(
        root: PathBuf,
        config: ArborConfig,
        provider: Arc<dyn GitProvider>,
        factory: Arc<dyn WatcherFactory>,
    ) -> (EngineHandle, JoinHandle<()>) {
        let (engine, handle) = Self::new(root, config, provider, factory);
        (handle, tokio::spawn(engine.run()))
    }

    /// Run until [`EngineCommand::Shutdown`] or until every handle is dropped.
    pub async fn run(mut self) {
        let Some(mut inbox) = self.inbox.take() else {
            return;
        };
        self.start().await;

        let mut sweep = tokio::time::interval(self.config.activity.sweep_interval());
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        sweep.tick().await;

        loop {
            let git_deadline = self.git.refresh_deadline();
            let rebuild_deadline = self.rebuild.deadline();
            let idle = Instant::now() + Duration::from_secs(3600);
            let dirty = tokio::select! {
                command = inbox.commands.recv() => match command {
                    Some(EngineCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                Some(event) = inbox.events.recv() => self.handle_watch_event(event),
                Some(message) = inbox.internal.recv() => self.handle_internal(message),
                _ = sleep_until(git_deadline.unwrap_or(idle)), if git_deadline.is_some() => {
                    self.run_git_refresh()
                }
                _ = sleep_until(rebuild_deadline.unwrap_or(idle)), if rebuild_deadline.is_some() => {
                    self.run_rebuild()
                }
                _ = sweep.tick() => {
                    let now = self.wall_now();
                    self.activity.prune(now) > 0
                }
            };
            if dirty {
                self.publish();
            }
        }

        if let Some(watcher) = self.watcher.take() {
            watcher.stop().await;
        }
        info!(root = %self.root.display(), "Engine stopped");
    }

    async fn start(&mut self) {
        info!(root = %self.root.display(), "Starting engine");
        match build_async(self.root.clone(), self.config.tree.clone()).await {
            Ok(tree) => self.tree = Arc::new(tree),
            Err(e) => {
                warn!(root = %self.root.display(), error = %e, "Initial tree build failed");
                self.notify(Notice::error(e.to_string()));
            }
        }
        if self.config.watch.enabled {
            match self.factory.start(&self.root, &self.config.watch, self.sink.clone()).await {
                Ok(watcher) => self.watcher = Some(watcher),
                Err(e) => {
                    warn!(root = %self.root.display(), error = %e, "Watcher failed to start");
                    self.notify(Notice::warning(format!("Live updates unavailable: {}", e)));
                }
            }
        }
        self.spawn_git_fetch(false);
        self.spawn_worktree_load();
        self.publish();
    }

    /// Wall-clock time advanced by the runtime clock, so activity ages with
    /// `tokio::time`.
    fn wall_now(&self) -> DateTime<Utc> {
        let (origin, wall) = self.clock;
        let elapsed = chrono::Duration::from_std(Instant::now() - origin)
            .unwrap_or_else(|_| chrono::Duration::zero());
        wall + elapsed
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push_back(notice);
        while self.notices.len() > MAX_NOTICES {
            self.notices.pop_front();
        }
    }

    fn selected_row(&self) -> Option<&FlattenedNode> {
        let selected = self.selected.as_deref()?;
        self.rows.iter().find(|row| row.path == selected)
    }

    async fn handle_command(&mut self, command: EngineCommand) -> bool {
        debug!(command = ?command, "Handling command");
        if command.is_navigation() {
            self.selection_cleared = false;
        }
        match command {
            EngineCommand::Move(delta) => {
                self.selected = move_selection(&self.rows, self.selected.as_deref(), delta);
            }
            EngineCommand::PageDown(height) => {
                self.selected = move_selection(&self.rows, self.selected.as_deref(), page_delta(height));
            }
            EngineCommand::PageUp(height) => {
                self.selected = move_selection(&self.rows, self.selected.as_deref(), -page_delta(height));
            }
            EngineCommand::JumpStart => self.selected = jump_to_start(&self.rows),
            EngineCommand::JumpEnd => self.selected = jump_to_end(&self.rows),
            EngineCommand::Right => match right_arrow_action(self.selected_row()) {
                RightAction::Expand => {
                    if let Some(path) = self.selected.clone() {
                        self.expanded.insert(path);
                    }
                }
                RightAction::Open => {
                    if let Some(path) = self.selected.clone() {
                        let _ = self.intents.send(EngineIntent::Open(path));
                    }
                    return false;
                }
                RightAction::None => return false,
            },
            EngineCommand::Left => match left_arrow_action(self.selected_row(), &self.rows) {
                LeftAction::Collapse => {
                    if let Some(path) = &self.selected {
                        self.expanded.remove(path);
                    }
                }
                LeftAction::SelectParent(parent) => self.selected = Some(parent),
                LeftAction::None => return false,
            },
            EngineCommand::Toggle => {
                let Some(row) = self.selected_row().filter(|row| row.is_dir()) else {
                    return false;
                };
                let path = row.path.clone();
                if !self.expanded.remove(&path) {
                    self.expanded.insert(path);
                }
            }
            EngineCommand::Select(path) => {
                if find_node(&self.tree, &path).is_none() {
                    return false;
                }
                self.expanded.extend(reveal_path(&self.tree, &path));
                self.selected = Some(path);
            }
            EngineCommand::SetFilter(pattern) => {
                self.filter = pattern.filter(|p| !p.trim().is_empty());
            }
            EngineCommand::Refresh => {
                self.git.invalidate(&self.root);
                self.spawn_git_fetch(true);
                self.spawn_tree_build(false);
                self.spawn_worktree_load();
                return false;
            }
            EngineCommand::SwitchWorktree(key) => self.switch_to(&key).await,
            EngineCommand::SetGitEnabled(enabled) => {
                self.git.set_admin_enabled(enabled);
                if enabled {
                    self.spawn_git_fetch(true);
                }
            }
            EngineCommand::ClearActivity => self.activity.clear(),
            EngineCommand::Shutdown => return false,
        }
        true
    }

    fn handle_watch_event(&mut self, event: WatchEvent) -> bool {
        let current = self.watcher.as_ref().map(|w| w.epoch());
        if current != Some(event.epoch) {
            debug!(
                epoch = event.epoch,
                current = ?current,
                path = %event.path.display(),
                "Dropping event from retired watcher"
            );
            return false;
        }
        let recorded = self.activity.record(event.kind, &event.path, self.wall_now());
        let now = Instant::now();
        self.git.request_refresh();
        self.rebuild.call(now);
        recorded
    }

    fn handle_internal(&mut self, message: Internal) -> bool {
        match message {
            Internal::TreeBuilt {
                generation,
                debounced,
                result,
            } => {
                if debounced {
                    self.rebuild.complete();
                }
                if generation != self.tree_generation {
                    debug!(generation, current = self.tree_generation, "Dropping superseded tree build");
                    return false;
                }
                match result {
                    Ok(tree) => {
                        self.tree = Arc::new(tree);
                        let directories: HashSet<PathBuf> = directory_paths(&self.tree).into_iter().collect();
                        self.expanded.retain(|path| directories.contains(path));
                    }
                    Err(e) => {
                        warn!(root = %self.root.display(), error = %e, "Tree rebuild failed");
                        self.tree = Arc::new(Vec::new());
                        self.notify(Notice::error(e.to_string()));
                    }
                }
                true
            }
            Internal::GitSettled => true,
            Internal::WorktreesLoaded { root, result } => {
                if root != self.root {
                    return false;
                }
                match result {
                    Ok(mut worktrees) => {
                        mark_current(&mut worktrees, &self.root);
                        self.worktrees = worktrees;
                    }
                    Err(e) => {
                        debug!(root = %root.display(), error = %e, "No worktrees listed");
                        self.worktrees.clear();
                    }
                }
                true
            }
        }
    }

    fn spawn_git_fetch(&self, force: bool) {
        let cache = self.git.clone();
        let root = self.root.clone();
        let internal = self.internal.clone();
        tokio::spawn(async move {
            cache.fetch(&root, force).await;
            let _ = internal.send(Internal::GitSettled);
        });
    }

    fn run_git_refresh(&mut self) -> bool {
        if !self.git.begin_due_refresh(Instant::now()) {
            return false;
        }
        let cache = self.git.clone();
        let root = self.root.clone();
        let internal = self.internal.clone();
        tokio::spawn(async move {
            cache.fetch(&root, true).await;
            cache.finish_refresh();
            let _ = internal.send(Internal::GitSettled);
        });
        true
    }

    fn run_rebuild(&mut self) -> bool {
        if self.rebuild.poll(Instant::now()) {
            self.spawn_tree_build(true);
        }
        false
    }

    fn spawn_tree_build(&mut self, debounced: bool) {
        self.tree_generation += 1;
        let generation = self.tree_generation;
        let root = self.root.clone();
        let config = self.config.tree.clone();
        let internal = self.internal.clone();
        tokio::spawn(async move {
            let result = build_async(root, config).await;
            let _ = internal.send(Internal::TreeBuilt {
                generation,
                debounced,
                result,
            });
        });
    }

    fn spawn_worktree_load(&self) {
        let provider = Arc::clone(&self.provider);
        let root = self.root.clone();
        let internal = self.internal.clone();
        tokio::spawn(async move {
            let result = provider.list_worktrees(&root).await;
            let _ = internal.send(Internal::WorktreesLoaded { root, result });
        });
    }

    async fn switch_to(&mut self, key: &str) {
        if !self.worktrees.iter().any(|w| w.matches(key)) {
            match self.provider.list_worktrees(&self.root).await {
                Ok(mut worktrees) => {
                    mark_current(&mut worktrees, &self.root);
                    self.worktrees = worktrees;
                }
                Err(e) => debug!(error = %e, "Worktree listing failed"),
            }
        }
        let Some(target) = self.worktrees.iter().find(|w| w.matches(key)).cloned() else {
            self.notify(Notice::error(SwitchError::UnknownWorktree(key.to_string()).to_string()));
            return;
        };
        if target.id == normalize_path(&self.root) {
            self.notify(Notice::info(format!("Already on {}", target.name)));
            return;
        }

        let previous_root = std::mem::replace(&mut self.root, target.path.clone());
        let selected = self.selected.take();
        self.expanded.clear();
        self.git.clear();
        self.rebuild.cancel();
        self.tree_generation += 1;
        self.tree = Arc::new(Vec::new());
        self.overlay.reset();
        self.activity.set_root(target.path.clone());
        self.publish();

        let outcome = switch_worktree(
            &target,
            self.watcher.take(),
            &previous_root,
            selected.as_deref(),
            &self.config,
            self.factory.as_ref(),
            self.sink.clone(),
        )
        .await;
        match outcome {
            Ok(outcome) => {
                self.tree = Arc::new(outcome.tree);
                self.watcher = outcome.watcher;
                if let Some(e) = outcome.watcher_error {
                    self.notify(Notice::warning(format!("Live updates unavailable: {}", e)));
                }
                if let Some(selected) = &outcome.selected {
                    self.expanded.extend(reveal_path(&self.tree, selected));
                }
                self.selection_cleared = outcome.selected.is_none();
                self.selected = outcome.selected;
                self.notify(Notice::info(format!("Switched to {}", target.name)));
            }
            Err(e) => {
                warn!(error = %e, "Worktree switch failed");
                self.notify(Notice::error(e.to_string()));
            }
        }
        mark_current(&mut self.worktrees, &self.root);
        self.spawn_git_fetch(false);
    }

    fn compute_rows(&mut self) -> Vec<FlattenedNode> {
        let status = self.git.status_map();
        let overlaid = self.overlay.apply(&self.tree, &status);
        match self.filter.as_deref() {
            Some(pattern) => {
                let filtered = filter_by_name(&overlaid, pattern);
                let all: HashSet<PathBuf> = directory_paths(&filtered).into_iter().collect();
                flatten(&filtered, &all)
            }
            None => flatten(&overlaid, &self.expanded),
        }
    }

    /// Keep the selection on a visible row: the nearest visible ancestor when the
    /// selected row disappeared, else the first row. A selection cleared by a
    /// switch stays empty.
    fn resolve_selection(&mut self) {
        if self.rows.is_empty() || (self.selected.is_none() && self.selection_cleared) {
            return;
        }
        if let Some(selected) = self.selected.as_deref() {
            if index_of(&self.rows, selected).is_some() {
                return;
            }
            let ancestor = selected
                .ancestors()
                .skip(1)
                .find(|ancestor| index_of(&self.rows, ancestor).is_some())
                .map(Path::to_path_buf);
            if ancestor.is_some() {
                self.selected = ancestor;
                return;
            }
        }
        self.selected = jump_to_start(&self.rows);
    }

    fn publish(&mut self) {
        self.rows = Arc::new(self.compute_rows());
        self.resolve_selection();
        self.revision += 1;
        let git = self.git.snapshot();
        let snapshot = ViewSnapshot {
            revision: self.revision,
            root: self.root.clone(),
            rows: Arc::clone(&self.rows),
            selected_index: self
                .selected
                .as_deref()
                .and_then(|selected| index_of(&self.rows, selected)),
            selected: self.selected.clone(),
            filter: self.filter.clone(),
            git_enabled: git.enabled,
            git_phase: git.phase,
            git_error: git.last_error,
            git_status: git.map,
            worktrees: self.worktrees.clone(),
            recent_activity: self.activity.recent(),
            notices: self.notices.iter().cloned().collect(),
            watching: self.watcher.is_some(),
        };
        self.view.send_replace(snapshot);
    }
}
