//! Format trees, worktrees, git status and activity as text.

use crate::activity::ActivityEvent;
use crate::engine::{Notice, NoticeLevel};
use crate::git::{GitFileStatus, GitStatusMap, Worktree};
use crate::tree::FlattenedNode;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use std::path::Path;

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

/// Coloured single-character marker for a status.
pub fn format_status_marker(status: GitFileStatus) -> String {
    let marker = status.marker();
    match status {
        GitFileStatus::Modified => marker.yellow().to_string(),
        GitFileStatus::Added => marker.green().to_string(),
        GitFileStatus::Deleted => marker.red().to_string(),
        GitFileStatus::Untracked => marker.cyan().to_string(),
        GitFileStatus::Ignored => marker.dimmed().to_string(),
    }
}

/// One line per row: guides, name, trailing status marker.
pub fn format_tree_text(rows: &[FlattenedNode]) -> String {
    let mut out = String::new();
    for row in rows {
        out.push_str(&row.guide_prefix());
        if row.is_dir() {
            out.push_str(&format!("{}/", row.name.blue().bold()));
        } else {
            out.push_str(&row.name);
        }
        if let Some(status) = row.git_status {
            out.push(' ');
            out.push_str(&format_status_marker(status));
        }
        out.push('\n');
    }
    out
}

pub fn format_worktrees_text(worktrees: &[Worktree]) -> String {
    if worktrees.is_empty() {
        return "No worktrees found (not a git repository?)".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["", "Name", "Branch", "Path"]);
    for worktree in worktrees {
        let mut branch = worktree.branch.clone().unwrap_or_else(|| "(detached)".to_string());
        if worktree.is_locked {
            branch.push_str(" [locked]");
        }
        table.add_row(vec![
            if worktree.is_current { "*" } else { "" }.to_string(),
            worktree.name.clone(),
            branch,
            worktree.path.display().to_string(),
        ]);
    }
    format!("{}\n\n{}", format_section_heading("Worktrees"), table)
}

/// Summary counts and a per-path table, paths shown relative to `root`.
pub fn format_status_text(root: &Path, status: &GitStatusMap, enabled: bool) -> String {
    let mut out = format!("{}\n\n", format_section_heading("Git Status"));
    if !enabled {
        out.push_str("  Git status unavailable for this workspace.\n");
        return out;
    }
    if status.is_empty() {
        out.push_str("  Working tree clean.\n");
        return out;
    }

    let mut counts = [0usize; 5];
    for (_, s) in status.iter() {
        counts[status_rank(*s)] += 1;
    }
    let labels = ["modified", "added", "deleted", "untracked", "ignored"];
    let summary: Vec<String> = labels
        .iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|(label, count)| format!("{} {}", count, label))
        .collect();
    out.push_str(&format!("  {}\n\n", summary.join(", ")));

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["", "Path", "Status"]);
    for (path, s) in status.sorted() {
        let shown = path.strip_prefix(root).unwrap_or(path);
        table.add_row(vec![
            format_status_marker(s),
            shown.display().to_string(),
            s.as_str().to_string(),
        ]);
    }
    out.push_str(&format!("{}\n", table));
    out
}

fn status_rank(status: GitFileStatus) -> usize {
    match status {
        GitFileStatus::Modified => 0,
        GitFileStatus::Added => 1,
        GitFileStatus::Deleted => 2,
        GitFileStatus::Untracked => 3,
        GitFileStatus::Ignored => 4,
    }
}

pub fn format_activity_line(event: &ActivityEvent) -> String {
    format!(
        "{} {:<9} {}",
        event.timestamp.format("%H:%M:%S%.3f").dimmed(),
        event.kind.as_str(),
        event.path.display()
    )
}

pub fn format_notice(notice: &Notice) -> String {
    match notice.level {
        NoticeLevel::Info => format!("{} {}", "info:".green(), notice.message),
        NoticeLevel::Warning => format!("{} {}", "warning:".yellow(), notice.message),
        NoticeLevel::Error => format!("{} {}", "error:".red(), notice.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{flatten, TreeNode};
    use std::collections::HashSet;
    use std::path::PathBuf;

    #[test]
    fn test_tree_text_draws_guides() {
        let mut readme = TreeNode::file("/w/README.md", 0);
        readme.git_status = Some(GitFileStatus::Modified);
        let tree = vec![
            TreeNode::directory("/w/src", 0, vec![TreeNode::file("/w/src/a.rs", 1)]),
            readme,
        ];
        let expanded: HashSet<PathBuf> = [PathBuf::from("/w/src")].into_iter().collect();
        let text = format_tree_text(&flatten(&tree, &expanded));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("├─ "));
        assert!(lines[1].starts_with("│  └─ a.rs"));
        assert!(lines[2].starts_with("└─ README.md"));
        assert!(lines[2].contains('M'));
    }

    #[test]
    fn test_status_text_counts_by_kind() {
        let status: GitStatusMap = [
            (PathBuf::from("/w/a.rs"), GitFileStatus::Modified),
            (PathBuf::from("/w/b.rs"), GitFileStatus::Modified),
            (PathBuf::from("/w/new.rs"), GitFileStatus::Untracked),
        ]
        .into_iter()
        .collect();
        let text = format_status_text(Path::new("/w"), &status, true);
        assert!(text.contains("2 modified, 1 untracked"));
        assert!(text.contains("new.rs"));
        assert!(!text.contains("/w/new.rs"));

        let disabled = format_status_text(Path::new("/w"), &GitStatusMap::new(), false);
        assert!(disabled.contains("unavailable"));
    }

    #[test]
    fn test_worktrees_table_marks_current() {
        let mut main = Worktree::new("/repo", Some("main".to_string()));
        main.is_current = true;
        let feature = Worktree::new("/repo-feature", None);
        let text = format_worktrees_text(&[main, feature]);
        assert!(text.contains("main"));
        assert!(text.contains("(detached)"));
        assert!(text.contains('*'));
        assert!(format_worktrees_text(&[]).contains("No worktrees"));
    }
}
