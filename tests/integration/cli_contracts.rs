use std::path::Path;
use std::sync::Arc;

use arbor::config::ArborConfig;
use arbor::git::{GitFileStatus, GitStatusMap, Worktree};
use arbor::tooling::cli::{CliContext, Commands, OutputFormat};

use crate::integration::support::{workspace, ScriptedGit};

fn context(root: &Path, git: Arc<ScriptedGit>) -> CliContext {
    CliContext::with_config(root.to_path_buf(), ArborConfig::default(), git)
}

fn repository(root: &Path) -> Arc<ScriptedGit> {
    let status: GitStatusMap = [(root.join("README.md"), GitFileStatus::Modified)]
        .into_iter()
        .collect();
    let mut other = Worktree::new(root.join("../elsewhere"), Some("feature".to_string()));
    other.is_locked = true;
    ScriptedGit::repository(
        status,
        vec![Worktree::new(root.to_path_buf(), Some("main".to_string())), other],
    )
}

#[tokio::test]
async fn tree_json_contract_has_nodes_and_status() {
    let (_dir, root) = workspace(&["src/a.ts", "README.md"]);
    let cli = context(&root, repository(&root));
    let output = cli
        .execute(&Commands::Tree {
            expand_all: false,
            filter: None,
            format: OutputFormat::Json,
        })
        .await
        .unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed.get("git_enabled").and_then(|v| v.as_bool()), Some(true));
    let nodes = parsed.get("nodes").and_then(|v| v.as_array()).unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].get("kind").and_then(|v| v.as_str()), Some("directory"));
    assert_eq!(nodes[0].get("children").and_then(|v| v.as_array()).map(Vec::len), Some(1));
    assert_eq!(nodes[1].get("name").and_then(|v| v.as_str()), Some("README.md"));
    assert_eq!(nodes[1].get("git_status").and_then(|v| v.as_str()), Some("modified"));
}

#[tokio::test]
async fn tree_text_expands_on_request() {
    let (_dir, root) = workspace(&["src/a.ts", "README.md"]);
    let cli = context(&root, ScriptedGit::not_a_repository());

    let collapsed = cli
        .execute(&Commands::Tree {
            expand_all: false,
            filter: None,
            format: OutputFormat::Text,
        })
        .await
        .unwrap();
    assert_eq!(collapsed.lines().count(), 3);
    assert!(!collapsed.contains("a.ts"));

    let expanded = cli
        .execute(&Commands::Tree {
            expand_all: true,
            filter: None,
            format: OutputFormat::Text,
        })
        .await
        .unwrap();
    assert_eq!(expanded.lines().count(), 4);
    assert!(expanded.contains("└─ a.ts"));
}

#[tokio::test]
async fn status_json_contract_uses_relative_paths() {
    let (_dir, root) = workspace(&["README.md"]);
    let cli = context(&root, repository(&root));
    let output = cli
        .execute(&Commands::Status {
            format: OutputFormat::Json,
        })
        .await
        .unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed.get("enabled").and_then(|v| v.as_bool()), Some(true));
    let entries = parsed.get("entries").and_then(|v| v.as_array()).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].get("path").and_then(|v| v.as_str()), Some("README.md"));
    assert_eq!(entries[0].get("status").and_then(|v| v.as_str()), Some("modified"));
}

#[tokio::test]
async fn status_outside_a_repository_reports_unavailable() {
    let (_dir, root) = workspace(&["README.md"]);
    let cli = context(&root, ScriptedGit::not_a_repository());
    let output = cli
        .execute(&Commands::Status {
            format: OutputFormat::Text,
        })
        .await
        .unwrap();
    assert!(output.contains("unavailable"));
}

#[tokio::test]
async fn worktrees_json_marks_the_current_checkout() {
    let (_dir, root) = workspace(&["README.md"]);
    let cli = context(&root, repository(&root));
    let output = cli
        .execute(&Commands::Worktrees {
            format: OutputFormat::Json,
        })
        .await
        .unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    let worktrees = parsed.as_array().unwrap();
    assert_eq!(worktrees.len(), 2);
    let current: Vec<&str> = worktrees
        .iter()
        .filter(|w| w.get("is_current").and_then(|v| v.as_bool()) == Some(true))
        .filter_map(|w| w.get("name").and_then(|v| v.as_str()))
        .collect();
    assert_eq!(current, ["main"]);
    assert_eq!(worktrees[1].get("is_locked").and_then(|v| v.as_bool()), Some(true));
}
