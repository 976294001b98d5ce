use std::collections::HashSet;
use std::path::PathBuf;

use arbor::config::TreeConfig;
use arbor::tree::{build, directory_paths, filter_by_name, flatten};

use crate::integration::support::workspace;

fn names(tree: &[arbor::tree::TreeNode]) -> Vec<String> {
    let expanded: HashSet<PathBuf> = directory_paths(tree).into_iter().collect();
    flatten(tree, &expanded).into_iter().map(|row| row.name).collect()
}

#[test]
fn fuzzy_filter_keeps_matching_file_and_its_ancestors() {
    let (_dir, root) = workspace(&["src/app.ts", "src/test.ts", "src/component.tsx"]);
    let tree = build(&root, &TreeConfig::default()).unwrap();

    let filtered = filter_by_name(&tree, "app");
    assert_eq!(names(&filtered), ["src", "app.ts"]);
    assert_eq!(filtered[0].path, root.join("src"));
    assert_eq!(filtered[0].children[0].path, root.join("src/app.ts"));

    assert_eq!(filter_by_name(&tree, ""), tree);
    assert!(filter_by_name(&tree, "zzz").is_empty());
}

#[test]
fn filter_matches_on_the_relative_path() {
    let (_dir, root) = workspace(&["docs/guide.md", "lib/mod.rs", "README.md"]);
    let tree = build(&root, &TreeConfig::default()).unwrap();

    // "dg" only matches across the directory separator of docs/guide.md.
    let filtered = filter_by_name(&tree, "dg");
    assert_eq!(names(&filtered), ["docs", "guide.md"]);
}

#[test]
fn builds_are_deterministic_and_skip_git_metadata() {
    let (_dir, root) = workspace(&[
        ".git/HEAD",
        "b/two.rs",
        "a/one.rs",
        "z.txt",
        "node_modules/pkg/index.js",
    ]);
    let config = TreeConfig::default();
    let first = build(&root, &config).unwrap();
    let second = build(&root, &config).unwrap();
    assert_eq!(first, second);
    assert_eq!(names(&first), ["a", "one.rs", "b", "two.rs", "z.txt"]);
}
