use std::path::{Path, PathBuf};

use arbor::config::{ArborConfig, SelectionMatch};
use arbor::engine::{Engine, EngineCommand, NoticeLevel};
use arbor::error::SwitchError;
use arbor::git::{GitStatusMap, Worktree};
use arbor::switch::switch_worktree;
use arbor::watch::{ChangeKind, WatcherFactory};
use tokio::sync::mpsc;

use crate::integration::support::{row_names, wait_for, workspace, RecordingWatchers, ScriptedGit};

fn worktree(path: &Path, branch: &str) -> Worktree {
    Worktree::new(path.to_path_buf(), Some(branch.to_string()))
}

#[tokio::test]
async fn switch_keeps_selection_when_the_relative_path_exists() {
    let (_a, a) = workspace(&["src/app.ts"]);
    let (_b, b) = workspace(&["src/app.ts", "src/other.ts"]);
    let (_c, c) = workspace(&["lib/index.ts"]);
    let watchers = RecordingWatchers::new();
    let (sink, _events) = mpsc::unbounded_channel();
    let config = ArborConfig::default();

    let first = watchers.start(&a, &config.watch, sink.clone()).await.unwrap();
    let outcome = switch_worktree(
        &worktree(&b, "feature"),
        Some(first),
        &a,
        Some(a.join("src/app.ts").as_path()),
        &config,
        watchers.as_ref(),
        sink.clone(),
    )
    .await
    .unwrap();
    assert_eq!(outcome.selected, Some(b.join("src/app.ts")));
    assert_eq!(outcome.tree.len(), 1);
    assert!(outcome.watcher_error.is_none());
    let watcher = outcome.watcher.unwrap();
    assert_eq!(watcher.epoch(), 2);
    assert_eq!(watcher.root(), b.as_path());
    assert_eq!(
        watchers.log(),
        [
            format!("start 1 {}", a.display()),
            "stop 1".to_string(),
            format!("start 2 {}", b.display()),
        ]
    );

    let outcome = switch_worktree(
        &worktree(&c, "other"),
        Some(watcher),
        &b,
        Some(b.join("src/app.ts").as_path()),
        &config,
        watchers.as_ref(),
        sink,
    )
    .await
    .unwrap();
    assert_eq!(outcome.selected, None);
    let expected = format!("start 3 {}", c.display());
    assert_eq!(watchers.log().last(), Some(&expected));
}

#[tokio::test]
async fn failed_build_leaves_the_old_watcher_stopped() {
    let (_a, a) = workspace(&["a.ts"]);
    let watchers = RecordingWatchers::new();
    let (sink, _events) = mpsc::unbounded_channel();
    let mut config = ArborConfig::default();
    config.worktree.selection_match = SelectionMatch::Relative;

    let first = watchers.start(&a, &config.watch, sink.clone()).await.unwrap();
    let missing = a.join("no-such-worktree");
    let result = switch_worktree(
        &worktree(&missing, "gone"),
        Some(first),
        &a,
        None,
        &config,
        watchers.as_ref(),
        sink,
    )
    .await;
    assert!(matches!(result, Err(SwitchError::Build { ref path, .. }) if *path == missing));
    assert_eq!(watchers.log(), [format!("start 1 {}", a.display()), "stop 1".to_string()]);
}

#[tokio::test]
async fn engine_switch_moves_watcher_and_selection() {
    let (_a, a) = workspace(&["src/app.ts", "README.md"]);
    let (_b, b) = workspace(&["src/app.ts", "docs/guide.md"]);
    let git = ScriptedGit::repository(
        GitStatusMap::new(),
        vec![worktree(&a, "main"), worktree(&b, "feature")],
    );
    let watchers = RecordingWatchers::new();
    let (mut handle, task) = Engine::spawn(a.clone(), ArborConfig::default(), git, watchers.clone());

    wait_for(&mut handle, |v| v.rows.len() == 2 && !v.worktrees.is_empty()).await;
    handle
        .send(EngineCommand::Select(a.join("src/app.ts")))
        .await
        .unwrap();
    let view = wait_for(&mut handle, |v| v.selected == Some(a.join("src/app.ts"))).await;
    assert_eq!(row_names(&view), ["src", "app.ts", "README.md"]);

    handle
        .send(EngineCommand::SwitchWorktree("feature".to_string()))
        .await
        .unwrap();
    let view = wait_for(&mut handle, |v| v.root == b && !v.rows.is_empty()).await;
    assert_eq!(view.selected, Some(b.join("src/app.ts")));
    assert_eq!(row_names(&view), ["docs", "src", "app.ts"]);
    assert_eq!(view.active_worktree().map(|w| w.name.as_str()), Some("feature"));
    assert!(view.notices.iter().any(|n| n.message.contains("feature")));
    assert_eq!(
        watchers.log(),
        [
            format!("start 1 {}", a.display()),
            "stop 1".to_string(),
            format!("start 2 {}", b.display()),
        ]
    );

    // A late event from the first watcher must not land in the new session.
    watchers.emit(1, ChangeKind::Change, b.join("src/app.ts"));
    watchers.emit(2, ChangeKind::Add, b.join("docs/guide.md"));
    let view = wait_for(&mut handle, |v| !v.recent_activity.is_empty()).await;
    assert_eq!(view.recent_activity.len(), 1);
    assert_eq!(view.recent_activity[0].path, PathBuf::from("docs/guide.md"));

    handle
        .send(EngineCommand::SwitchWorktree("nowhere".to_string()))
        .await
        .unwrap();
    let view = wait_for(&mut handle, |v| {
        v.notices.iter().any(|n| n.level == NoticeLevel::Error)
    })
    .await;
    assert_eq!(view.root, b);
    assert!(view.notices.iter().any(|n| n.message == "Unknown worktree: nowhere"));

    handle.send(EngineCommand::Shutdown).await.unwrap();
    task.await.unwrap();
    assert_eq!(watchers.log().last().map(String::as_str), Some("stop 2"));
}

#[tokio::test]
async fn engine_switch_without_counterpart_leaves_selection_empty() {
    let (_a, a) = workspace(&["src/app.ts"]);
    let (_c, c) = workspace(&["lib/index.ts"]);
    let git = ScriptedGit::repository(
        GitStatusMap::new(),
        vec![worktree(&a, "main"), worktree(&c, "other")],
    );
    let (mut handle, task) = Engine::spawn(
        a.clone(),
        ArborConfig::default(),
        git,
        RecordingWatchers::new(),
    );

    wait_for(&mut handle, |v| !v.rows.is_empty() && !v.worktrees.is_empty()).await;
    handle
        .send(EngineCommand::Select(a.join("src/app.ts")))
        .await
        .unwrap();
    wait_for(&mut handle, |v| v.selected == Some(a.join("src/app.ts"))).await;

    handle
        .send(EngineCommand::SwitchWorktree("other".to_string()))
        .await
        .unwrap();
    let view = wait_for(&mut handle, |v| v.root == c && !v.rows.is_empty()).await;
    assert_eq!(view.selected, None);
    assert_eq!(view.selected_index, None);

    // Later publishes keep it empty until the user moves.
    handle
        .send(EngineCommand::SetFilter(Some("index".to_string())))
        .await
        .unwrap();
    let view = wait_for(&mut handle, |v| v.filter.is_some()).await;
    assert_eq!(row_names(&view), ["lib", "index.ts"]);
    assert_eq!(view.selected, None);
    handle.send(EngineCommand::SetFilter(None)).await.unwrap();
    let view = wait_for(&mut handle, |v| v.filter.is_none()).await;
    assert_eq!(view.selected, None);

    handle.send(EngineCommand::JumpStart).await.unwrap();
    let view = wait_for(&mut handle, |v| v.selected.is_some()).await;
    assert_eq!(view.selected, Some(c.join("lib")));

    handle.send(EngineCommand::Shutdown).await.unwrap();
    task.await.unwrap();
}
