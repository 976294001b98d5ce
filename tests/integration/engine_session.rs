use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use arbor::config::ArborConfig;
use arbor::engine::{Engine, EngineCommand, EngineIntent, NoticeLevel};
use arbor::git::{GitFileStatus, GitStatusMap, Worktree};
use arbor::watch::ChangeKind;

use crate::integration::support::{row_names, wait_for, workspace, RecordingWatchers, ScriptedGit};

#[tokio::test]
async fn expanding_a_directory_reveals_its_children() {
    let (_dir, root) = workspace(&["src/a.ts", "src/b.ts", "README.md"]);
    let watchers = RecordingWatchers::new();
    let (mut handle, task) = Engine::spawn(
        root.clone(),
        ArborConfig::default(),
        ScriptedGit::not_a_repository(),
        watchers.clone(),
    );

    let view = wait_for(&mut handle, |v| v.rows.len() == 2).await;
    assert_eq!(row_names(&view), ["src", "README.md"]);
    assert_eq!(view.selected, Some(root.join("src")));
    assert!(view.watching);

    handle.send(EngineCommand::Right).await.unwrap();
    let view = wait_for(&mut handle, |v| v.rows.len() == 4).await;
    assert_eq!(row_names(&view), ["src", "a.ts", "b.ts", "README.md"]);
    assert!(view.rows[0].expanded);
    assert_eq!(view.rows[1].depth, 1);

    handle.send(EngineCommand::Move(1)).await.unwrap();
    let view = wait_for(&mut handle, |v| v.selected == Some(root.join("src/a.ts"))).await;
    assert_eq!(view.selected_index, Some(1));

    handle.send(EngineCommand::Right).await.unwrap();
    assert_eq!(
        handle.next_intent().await,
        Some(EngineIntent::Open(root.join("src/a.ts")))
    );

    handle.send(EngineCommand::Left).await.unwrap();
    wait_for(&mut handle, |v| v.selected == Some(root.join("src"))).await;
    handle.send(EngineCommand::Left).await.unwrap();
    let view = wait_for(&mut handle, |v| v.rows.len() == 2).await;
    assert_eq!(view.selected, Some(root.join("src")));

    handle.send(EngineCommand::JumpEnd).await.unwrap();
    wait_for(&mut handle, |v| v.selected == Some(root.join("README.md"))).await;

    handle.send(EngineCommand::Shutdown).await.unwrap();
    task.await.unwrap();
    assert_eq!(
        watchers.log(),
        [format!("start 1 {}", root.display()), "stop 1".to_string()]
    );
}

#[tokio::test]
async fn events_from_a_retired_epoch_are_dropped() {
    let (_dir, root) = workspace(&["a.ts"]);
    let watchers = RecordingWatchers::new();
    let (mut handle, task) = Engine::spawn(
        root.clone(),
        ArborConfig::default(),
        ScriptedGit::not_a_repository(),
        watchers.clone(),
    );
    wait_for(&mut handle, |v| v.rows.len() == 1).await;
    let epoch = watchers.latest_epoch().unwrap();

    fs::write(root.join("b.ts"), "b").unwrap();
    watchers.emit(epoch + 7, ChangeKind::Add, root.join("ghost.ts"));
    watchers.emit(epoch, ChangeKind::Add, root.join("b.ts"));

    let view = wait_for(&mut handle, |v| !v.recent_activity.is_empty()).await;
    assert_eq!(view.recent_activity.len(), 1);
    assert_eq!(view.recent_activity[0].path, PathBuf::from("b.ts"));
    assert_eq!(view.recent_activity[0].kind, ChangeKind::Add);

    // The event also schedules a rebuild that picks up the new file.
    let view = wait_for(&mut handle, |v| v.rows.len() == 2).await;
    assert_eq!(row_names(&view), ["a.ts", "b.ts"]);

    watchers.emit(epoch, ChangeKind::Change, root.join("b.ts"));
    let view = wait_for(&mut handle, |v| {
        v.recent_activity.first().map(|e| e.kind) == Some(ChangeKind::Change)
    })
    .await;
    assert_eq!(view.recent_activity.len(), 1);

    handle.send(EngineCommand::ClearActivity).await.unwrap();
    wait_for(&mut handle, |v| v.recent_activity.is_empty()).await;

    handle.send(EngineCommand::Shutdown).await.unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn idle_sweep_prunes_expired_activity() {
    let (_dir, root) = workspace(&["a.ts"]);
    let mut config = ArborConfig::default();
    config.activity.window_minutes = 1;
    config.activity.sweep_interval_secs = 1;
    let watchers = RecordingWatchers::new();
    let (mut handle, task) = Engine::spawn(
        root.clone(),
        config,
        ScriptedGit::not_a_repository(),
        watchers.clone(),
    );
    wait_for(&mut handle, |v| v.rows.len() == 1).await;

    let epoch = watchers.latest_epoch().unwrap();
    watchers.emit(epoch, ChangeKind::Change, root.join("a.ts"));
    wait_for(&mut handle, |v| v.recent_activity.len() == 1).await;

    tokio::time::advance(Duration::from_secs(61)).await;
    let view = wait_for(&mut handle, |v| v.recent_activity.is_empty()).await;
    assert_eq!(row_names(&view), ["a.ts"]);

    handle.send(EngineCommand::Shutdown).await.unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn git_status_is_overlaid_and_filter_keeps_ancestors() {
    let (_dir, root) = workspace(&[
        "src/app.ts",
        "src/test.ts",
        "src/component.tsx",
        "README.md",
    ]);
    let status: GitStatusMap = [
        (root.join("README.md"), GitFileStatus::Modified),
        (root.join("src/app.ts"), GitFileStatus::Added),
    ]
    .into_iter()
    .collect();
    let git = ScriptedGit::repository(status, vec![Worktree::new(root.clone(), Some("main".to_string()))]);
    let (mut handle, task) = Engine::spawn(
        root.clone(),
        ArborConfig::default(),
        git,
        RecordingWatchers::new(),
    );

    let view = wait_for(&mut handle, |v| {
        v.git_enabled
            && !v.worktrees.is_empty()
            && v.rows.iter().any(|r| r.git_status == Some(GitFileStatus::Modified))
    })
    .await;
    assert_eq!(view.active_worktree().map(|w| w.name.as_str()), Some("main"));
    assert_eq!(view.git_status.len(), 2);

    handle
        .send(EngineCommand::SetFilter(Some("app".to_string())))
        .await
        .unwrap();
    let view = wait_for(&mut handle, |v| v.filter.is_some()).await;
    assert_eq!(row_names(&view), ["src", "app.ts"]);
    assert_eq!(view.rows[1].git_status, Some(GitFileStatus::Added));

    handle.send(EngineCommand::SetFilter(Some("  ".to_string()))).await.unwrap();
    let view = wait_for(&mut handle, |v| v.filter.is_none()).await;
    assert_eq!(row_names(&view), ["src", "README.md"]);

    handle.send(EngineCommand::SetGitEnabled(false)).await.unwrap();
    let view = wait_for(&mut handle, |v| !v.git_enabled).await;
    assert!(view.git_status.is_empty());
    assert!(view.rows.iter().all(|r| r.git_status.is_none()));

    handle.send(EngineCommand::Shutdown).await.unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn missing_root_publishes_an_error_notice() {
    let (dir, root) = workspace(&[]);
    let missing = root.join("gone");
    let (mut handle, task) = Engine::spawn(
        missing,
        ArborConfig::default(),
        ScriptedGit::not_a_repository(),
        RecordingWatchers::new(),
    );
    let view = wait_for(&mut handle, |v| !v.notices.is_empty()).await;
    assert!(view.rows.is_empty());
    assert_eq!(view.notices[0].level, NoticeLevel::Error);

    handle.send(EngineCommand::Shutdown).await.unwrap();
    task.await.unwrap();
    drop(dir);
}
