//! Recent activity: a bounded, time-windowed log of changed paths.
//!
//! Newest first, one entry per path. Entries leave when they age past the window
//! or when the buffer exceeds its capacity.

use crate::config::ActivityConfig;
use crate::paths::relative_to;
use crate::watch::ChangeKind;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityEvent {
    /// Root-relative path.
    pub path: PathBuf,
    pub kind: ChangeKind,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ActivityBuffer {
    root: PathBuf,
    window: Duration,
    max_entries: usize,
    entries: VecDeque<ActivityEvent>,
}

impl ActivityBuffer {
    pub fn new(root: impl Into<PathBuf>, window: Duration, max_entries: usize) -> Self {
        Self {
            root: root.into(),
            window,
            max_entries: max_entries.max(1),
            entries: VecDeque::new(),
        }
    }

    pub fn from_config(root: impl Into<PathBuf>, config: &ActivityConfig) -> Self {
        Self::new(root, config.window(), config.max_entries)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Record a change to `path` (absolute). Paths outside the root are ignored.
    /// Returns whether the buffer changed.
    pub fn record(&mut self, kind: ChangeKind, path: &Path, now: DateTime<Utc>) -> bool {
        let Some(relative) = relative_to(path, &self.root) else {
            return false;
        };
        if relative.as_os_str().is_empty() {
            return false;
        }
        self.entries.retain(|entry| entry.path != relative);
        self.entries.push_front(ActivityEvent {
            path: relative,
            kind,
            timestamp: now,
        });
        self.prune(now);
        true
    }

    /// Drop entries older than the window and trim to capacity. Returns how many
    /// entries were removed.
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let cutoff = now - self.window;
        self.entries.retain(|entry| entry.timestamp >= cutoff);
        self.entries.truncate(self.max_entries);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Point the buffer at a new root, discarding entries for the old one.
    pub fn set_root(&mut self, root: impl Into<PathBuf>) {
        self.root = root.into();
        self.entries.clear();
    }

    /// Entries, newest first.
    pub fn recent(&self) -> Vec<ActivityEvent> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
