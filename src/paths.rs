//! Path normalization helpers shared by the git, switch, and activity layers.

use std::path::{Component, Path, PathBuf};

/// Symlink-resolved absolute form of `path`.
///
/// Falls back to a lexical cleanup (`.` dropped, `..` folded) when the path does
/// not exist, so ids stay comparable for removed directories.
pub fn normalize_path(path: &Path) -> PathBuf {
    match dunce::canonicalize(path) {
        Ok(real) => real,
        Err(_) => lexical_clean(path),
    }
}

fn lexical_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// `path` relative to `root`, trying the literal root first and then its
/// symlink-resolved form.
pub fn relative_to(path: &Path, root: &Path) -> Option<PathBuf> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_path_buf());
    }
    let real_root = normalize_path(root);
    if let Ok(rel) = path.strip_prefix(&real_root) {
        return Some(rel.to_path_buf());
    }
    normalize_path(path)
        .strip_prefix(&real_root)
        .ok()
        .map(Path::to_path_buf)
}
