//! Change events, notify conversion, and per-path coalescing.

use crate::config::WatchConfig;
use crate::error::WatchError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;

/// Kind of a filesystem change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeKind {
    Add,
    Change,
    Unlink,
    AddDir,
    UnlinkDir,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Add => "add",
            ChangeKind::Change => "change",
            ChangeKind::Unlink => "unlink",
            ChangeKind::AddDir => "addDir",
            ChangeKind::UnlinkDir => "unlinkDir",
        }
    }
}

/// A change delivered to the engine, tagged with the epoch of the watcher that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: ChangeKind,
    pub path: PathBuf,
    pub epoch: u64,
}

/// Map one notify event to zero or more changes.
pub fn convert_event(event: &Event) -> Vec<(ChangeKind, PathBuf)> {
    let created = |path: &PathBuf| {
        if path.is_dir() {
            (ChangeKind::AddDir, path.clone())
        } else {
            (ChangeKind::Add, path.clone())
        }
    };
    match &event.kind {
        EventKind::Create(CreateKind::Folder) => {
            event.paths.iter().map(|p| (ChangeKind::AddDir, p.clone())).collect()
        }
        EventKind::Create(_) => event.paths.iter().map(created).collect(),
        EventKind::Remove(RemoveKind::Folder) => {
            event.paths.iter().map(|p| (ChangeKind::UnlinkDir, p.clone())).collect()
        }
        EventKind::Remove(_) => event.paths.iter().map(|p| (ChangeKind::Unlink, p.clone())).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            event.paths.iter().map(|p| (ChangeKind::Unlink, p.clone())).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event.paths.iter().map(created).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() >= 2 => {
            vec![(ChangeKind::Unlink, event.paths[0].clone()), created(&event.paths[1])]
        }
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|p| if p.exists() { created(p) } else { (ChangeKind::Unlink, p.clone()) })
            .collect(),
        EventKind::Modify(_) => event
            .paths
            .iter()
            .filter(|p| !p.is_dir())
            .map(|p| (ChangeKind::Change, p.clone()))
            .collect(),
        _ => Vec::new(),
    }
}

/// Per-path debounce for raw notifications.
///
/// A path is released once it has been quiet for the debounce window. Repeated
/// events for one path collapse into one, keeping the more informative kind.
pub(crate) struct EventCoalescer {
    root: PathBuf,
    debounce: Duration,
    ignore: GlobSet,
    pending: HashMap<PathBuf, (ChangeKind, Instant)>,
}

impl EventCoalescer {
    pub(crate) fn new(root: &Path, config: &WatchConfig) -> Result<Self, WatchError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.ignore_globs {
            let glob = Glob::new(pattern).map_err(|e| WatchError::InvalidGlob {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            builder.add(glob);
        }
        let ignore = builder.build().map_err(|e| WatchError::InvalidGlob {
            pattern: config.ignore_globs.join(","),
            message: e.to_string(),
        })?;
        Ok(Self {
            root: root.to_path_buf(),
            debounce: config.debounce(),
            ignore,
            pending: HashMap::new(),
        })
    }

    fn should_ignore(&self, path: &Path) -> bool {
        match path.strip_prefix(&self.root) {
            Ok(relative) => self.ignore.is_match(relative),
            Err(_) => self.ignore.is_match(path),
        }
    }

    /// Queue a change. Returns false when the path is ignored.
    pub(crate) fn add(&mut self, kind: ChangeKind, path: PathBuf, now: Instant) -> bool {
        if self.should_ignore(&path) {
            return false;
        }
        let merged = match self.pending.get(&path) {
            Some((previous, _)) => merge_kinds(*previous, kind),
            None => kind,
        };
        self.pending.insert(path, (merged, now));
        true
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|(_, at)| *at + self.debounce).min()
    }

    /// Remove and return changes that have been quiet long enough, in path order.
    pub(crate) fn drain_ready(&mut self, now: Instant) -> Vec<(ChangeKind, PathBuf)> {
        let debounce = self.debounce;
        let mut ready: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, (_, at))| now >= *at + debounce)
            .map(|(path, _)| path.clone())
            .collect();
        ready.sort();
        ready
            .into_iter()
            .filter_map(|path| self.pending.remove(&path).map(|(kind, _)| (kind, path)))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}

fn merge_kinds(previous: ChangeKind, next: ChangeKind) -> ChangeKind {
    match (previous, next) {
        (ChangeKind::Add, ChangeKind::Change) => ChangeKind::Add,
        (ChangeKind::AddDir, ChangeKind::Change) => ChangeKind::AddDir,
        (ChangeKind::Unlink, ChangeKind::Add) => ChangeKind::Change,
        (_, next) => next,
    }
}
