use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use arbor::tree::{count_nodes, directory_paths, flatten, walk_nodes, TreeNode};
use proptest::prelude::*;

/// Turn slash-separated relative paths into a tree under `root`. A path that is a
/// prefix of another becomes a directory.
fn tree_from_paths(root: &Path, paths: &BTreeSet<Vec<String>>, depth: usize) -> Vec<TreeNode> {
    let mut groups: BTreeMap<String, BTreeSet<Vec<String>>> = BTreeMap::new();
    for segments in paths {
        let (head, tail) = segments.split_first().unwrap();
        let entry = groups.entry(head.clone()).or_default();
        if !tail.is_empty() {
            entry.insert(tail.to_vec());
        }
    }
    groups
        .into_iter()
        .map(|(name, tails)| {
            let path = root.join(&name);
            if tails.is_empty() {
                TreeNode::file(path, depth)
            } else {
                let children = tree_from_paths(&path, &tails, depth + 1);
                TreeNode::directory(path, depth, children)
            }
        })
        .collect()
}

fn tree_strategy() -> impl Strategy<Value = Vec<TreeNode>> {
    prop::collection::btree_set("[a-d]{1,2}(/[a-d]{1,2}){0,3}", 1..24).prop_map(|paths| {
        let split: BTreeSet<Vec<String>> = paths
            .iter()
            .map(|p| p.split('/').map(str::to_string).collect())
            .collect();
        tree_from_paths(Path::new("/ws"), &split, 0)
    })
}

fn expanded_subset(tree: &[TreeNode], mask: &[bool]) -> HashSet<PathBuf> {
    directory_paths(tree)
        .into_iter()
        .enumerate()
        .filter(|(index, _)| mask[index % mask.len()])
        .map(|(_, path)| path)
        .collect()
}

/// Rows a flatten must produce: every node whose ancestors are all expanded.
fn visible_count(nodes: &[TreeNode], expanded: &HashSet<PathBuf>) -> usize {
    nodes
        .iter()
        .map(|node| {
            1 + if expanded.contains(&node.path) {
                visible_count(&node.children, expanded)
            } else {
                0
            }
        })
        .sum()
}

proptest! {
    #[test]
    fn flatten_is_idempotent(tree in tree_strategy(), mask in prop::collection::vec(any::<bool>(), 1..16)) {
        let expanded = expanded_subset(&tree, &mask);
        prop_assert_eq!(flatten(&tree, &expanded), flatten(&tree, &expanded));
    }

    #[test]
    fn flattened_paths_are_unique(tree in tree_strategy(), mask in prop::collection::vec(any::<bool>(), 1..16)) {
        let expanded = expanded_subset(&tree, &mask);
        let rows = flatten(&tree, &expanded);
        let unique: HashSet<&PathBuf> = rows.iter().map(|row| &row.path).collect();
        prop_assert_eq!(unique.len(), rows.len());
    }

    #[test]
    fn depth_matches_ancestor_flags(tree in tree_strategy()) {
        let everything: HashSet<PathBuf> = directory_paths(&tree).into_iter().collect();
        let rows = flatten(&tree, &everything);
        prop_assert_eq!(rows.len(), count_nodes(&tree));
        for row in &rows {
            let relative = row.path.strip_prefix("/ws").unwrap();
            prop_assert_eq!(row.depth + 1, relative.components().count());
            prop_assert_eq!(row.is_last_sibling_at_depth.len(), row.depth);
        }
        for pair in rows.windows(2) {
            prop_assert!(pair[1].depth <= pair[0].depth + 1);
        }
    }

    #[test]
    fn children_appear_only_under_expanded_directories(
        tree in tree_strategy(),
        mask in prop::collection::vec(any::<bool>(), 1..16),
    ) {
        let expanded = expanded_subset(&tree, &mask);
        let rows = flatten(&tree, &expanded);
        prop_assert_eq!(rows.len(), visible_count(&tree, &expanded));
        for (index, row) in rows.iter().enumerate() {
            let next_is_child = rows
                .get(index + 1)
                .map(|next| next.path.parent() == Some(row.path.as_path()))
                .unwrap_or(false);
            prop_assert_eq!(next_is_child, row.has_children && expanded.contains(&row.path));
            prop_assert_eq!(row.expanded, row.is_dir() && expanded.contains(&row.path));
        }
    }

    #[test]
    fn tree_paths_are_unique(tree in tree_strategy()) {
        let mut seen = HashSet::new();
        let mut duplicate = false;
        walk_nodes(&tree, &mut |node| duplicate |= !seen.insert(node.path.clone()));
        prop_assert!(!duplicate);
    }
}
