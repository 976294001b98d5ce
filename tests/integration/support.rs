//! Scripted collaborators and helpers shared by the integration tests.

use arbor::config::WatchConfig;
use arbor::engine::{EngineHandle, ViewSnapshot};
use arbor::error::{GitError, WatchError};
use arbor::git::{GitProvider, GitStatusMap, Worktree};
use arbor::watch::{ChangeKind, EventSink, FsWatcher, WatchEvent, WatcherFactory};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Create a scratch directory holding `files` (relative paths) and return it with
/// its canonical path.
pub fn workspace(files: &[&str]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let root = fs::canonicalize(dir.path()).unwrap();
    for file in files {
        let path = root.join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, file.as_bytes()).unwrap();
    }
    (dir, root)
}

/// Git provider answering from fixed data.
#[derive(Default)]
pub struct ScriptedGit {
    pub repository: bool,
    pub status: Mutex<GitStatusMap>,
    pub worktrees: Mutex<Vec<Worktree>>,
    pub status_calls: AtomicU64,
}

impl ScriptedGit {
    pub fn not_a_repository() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn repository(status: GitStatusMap, worktrees: Vec<Worktree>) -> Arc<Self> {
        Arc::new(Self {
            repository: true,
            status: Mutex::new(status),
            worktrees: Mutex::new(worktrees),
            status_calls: AtomicU64::new(0),
        })
    }
}

#[async_trait]
impl GitProvider for ScriptedGit {
    async fn is_repository(&self, _root: &Path) -> Result<bool, GitError> {
        Ok(self.repository)
    }

    async fn status(&self, _root: &Path) -> Result<GitStatusMap, GitError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.status.lock().clone())
    }

    async fn list_worktrees(&self, _root: &Path) -> Result<Vec<Worktree>, GitError> {
        if !self.repository {
            return Err(GitError::Command {
                command: "worktree list".to_string(),
                stderr: "not a git repository".to_string(),
            });
        }
        Ok(self.worktrees.lock().clone())
    }
}

struct Started {
    epoch: u64,
    sink: EventSink,
}

/// Watcher factory that never touches the OS. Tests push events by hand and read
/// back the start/stop sequence.
#[derive(Default)]
pub struct RecordingWatchers {
    next_epoch: AtomicU64,
    log: Arc<Mutex<Vec<String>>>,
    started: Mutex<Vec<Started>>,
}

impl RecordingWatchers {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn latest_epoch(&self) -> Option<u64> {
        self.started.lock().last().map(|s| s.epoch)
    }

    /// Deliver an event tagged with `epoch`, whether or not that watcher is live.
    pub fn emit(&self, epoch: u64, kind: ChangeKind, path: PathBuf) {
        let started = self.started.lock();
        let sink = &started.last().unwrap().sink;
        sink.send(WatchEvent { kind, path, epoch }).unwrap();
    }
}

#[async_trait]
impl WatcherFactory for RecordingWatchers {
    async fn start(
        &self,
        root: &Path,
        _config: &WatchConfig,
        sink: EventSink,
    ) -> Result<Box<dyn FsWatcher>, WatchError> {
        let epoch = self.next_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.lock().push(format!("start {} {}", epoch, root.display()));
        self.started.lock().push(Started { epoch, sink });
        Ok(Box::new(RecordingWatcher {
            root: root.to_path_buf(),
            epoch,
            log: Arc::clone(&self.log),
        }))
    }
}

struct RecordingWatcher {
    root: PathBuf,
    epoch: u64,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl FsWatcher for RecordingWatcher {
    fn root(&self) -> &Path {
        &self.root
    }

    fn epoch(&self) -> u64 {
        self.epoch
    }

    async fn stop(self: Box<Self>) {
        self.log.lock().push(format!("stop {}", self.epoch));
    }
}

/// Wait until a published snapshot satisfies `ready`.
pub async fn wait_for(
    handle: &mut EngineHandle,
    mut ready: impl FnMut(&ViewSnapshot) -> bool,
) -> ViewSnapshot {
    let current = handle.view();
    if ready(&current) {
        return current;
    }
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let view = handle.changed().await.expect("engine stopped");
            if ready(&view) {
                return view;
            }
        }
    })
    .await
    .expect("timed out waiting for view")
}

pub fn row_names(view: &ViewSnapshot) -> Vec<String> {
    view.rows.iter().map(|row| row.name.clone()).collect()
}
