//! Worktree switching.
//!
//! The old watcher is fully stopped before the new tree is built, and the new
//! watcher only starts once the tree exists. Combined with epoch-tagged events this
//! keeps events from the previous root out of the new session.

use crate::config::{ArborConfig, SelectionMatch};
use crate::error::{SwitchError, WatchError};
use crate::git::Worktree;
use crate::paths::{normalize_path, relative_to};
use crate::tree::{build_async, walk_nodes, TreeNode};
use crate::watch::{EventSink, FsWatcher, WatcherFactory};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// Everything the caller needs to resume on the new root.
pub struct SwitchOutcome {
    pub tree: Vec<TreeNode>,
    /// `None` when watching is disabled or the watcher failed to start.
    pub watcher: Option<Box<dyn FsWatcher>>,
    pub selected: Option<PathBuf>,
    /// Set when the tree was built but watching could not start.
    pub watcher_error: Option<WatchError>,
}

/// Move the session from `previous_root` to `target`.
///
/// On error the previous watcher has already been stopped.
pub async fn switch_worktree(
    target: &Worktree,
    current_watcher: Option<Box<dyn FsWatcher>>,
    previous_root: &Path,
    selected: Option<&Path>,
    config: &ArborConfig,
    factory: &dyn WatcherFactory,
    sink: EventSink,
) -> Result<SwitchOutcome, SwitchError> {
    info!(
        from = %previous_root.display(),
        to = %target.path.display(),
        "Switching worktree"
    );
    if let Some(watcher) = current_watcher {
        watcher.stop().await;
    }

    let tree = build_async(target.path.clone(), config.tree.clone())
        .await
        .map_err(|source| SwitchError::Build {
            path: target.path.clone(),
            source,
        })?;
    info!(root = %target.path.display(), top_level = tree.len(), "Built worktree tree");

    let selected = selected.and_then(|path| {
        preserve_selection(
            path,
            previous_root,
            &target.path,
            &tree,
            config.worktree.selection_match,
        )
    });

    let (watcher, watcher_error) = if config.watch.enabled {
        match factory.start(&target.path, &config.watch, sink).await {
            Ok(watcher) => (Some(watcher), None),
            Err(e) => {
                warn!(root = %target.path.display(), error = %e, "Watcher failed to start after switch");
                (None, Some(e))
            }
        }
    } else {
        (None, None)
    };

    Ok(SwitchOutcome {
        tree,
        watcher,
        selected,
        watcher_error,
    })
}

/// Find the node in `new_tree` that corresponds to `selected` from the old root.
///
/// Tries, in order: the same absolute path, the same root-relative path, and
/// (with [`SelectionMatch::Suffix`]) a node whose trailing path segments equal all
/// of the selection's relative segments. Matching is segment-aligned, so
/// `app.ts` never matches `myapp.ts`.
pub fn preserve_selection(
    selected: &Path,
    old_root: &Path,
    new_root: &Path,
    new_tree: &[TreeNode],
    mode: SelectionMatch,
) -> Option<PathBuf> {
    if selected.as_os_str().is_empty() {
        return None;
    }
    let mut candidates: Vec<(&Path, PathBuf)> = Vec::new();
    walk_nodes(new_tree, &mut |node| {
        if let Ok(relative) = node.path.strip_prefix(new_root) {
            candidates.push((node.path.as_path(), relative.to_path_buf()));
        }
    });

    let selected_real = normalize_path(selected);
    let new_root_real = normalize_path(new_root);
    if let Some((path, _)) = candidates
        .iter()
        .find(|(_, relative)| new_root_real.join(relative) == selected_real)
    {
        debug!(path = %path.display(), "Selection kept by absolute path");
        return Some(path.to_path_buf());
    }

    let old_relative = relative_to(selected, old_root);
    if let Some(old_relative) = &old_relative {
        if let Some((path, _)) = candidates.iter().find(|(_, relative)| relative == old_relative) {
            debug!(path = %path.display(), "Selection kept by relative path");
            return Some(path.to_path_buf());
        }
    }

    if mode != SelectionMatch::Suffix {
        return None;
    }
    let segments: PathBuf = match old_relative {
        Some(relative) => relative,
        None => selected
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect(),
    };
    if segments.as_os_str().is_empty() {
        return None;
    }
    candidates
        .iter()
        .find(|(_, relative)| relative.ends_with(&segments))
        .map(|(path, _)| {
            debug!(path = %path.display(), "Selection kept by trailing segments");
            path.to_path_buf()
        })
}
