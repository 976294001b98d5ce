//! Fuzzy name filter.
//!
//! Files are matched on their root-relative path (`src/app.ts`), so a pattern can
//! target a directory segment as well as a file name. A directory whose own name
//! matches keeps its whole subtree; otherwise it survives only while some
//! descendant matches.

use super::node::TreeNode;
use nucleo_matcher::{Config, Matcher, Utf32Str};

/// Prune `tree` to nodes matching `pattern`. Empty or blank patterns return the
/// tree unchanged. Surviving nodes keep their original depth and order.
pub fn filter_by_name(tree: &[TreeNode], pattern: &str) -> Vec<TreeNode> {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return tree.to_vec();
    }
    let mut filter = NameFilter::new(pattern);
    filter.filter_level(tree, "")
}

/// Fuzzy score of `text` against `pattern` (case-insensitive), `None` when it does
/// not match.
pub fn fuzzy_score(pattern: &str, text: &str) -> Option<u16> {
    NameFilter::new(pattern).score(text)
}

struct NameFilter {
    matcher: Matcher,
    needle: String,
    needle_buf: Vec<char>,
    haystack_buf: Vec<char>,
}

impl NameFilter {
    fn new(pattern: &str) -> Self {
        Self {
            matcher: Matcher::new(Config::DEFAULT),
            needle: pattern.to_lowercase(),
            needle_buf: Vec::new(),
            haystack_buf: Vec::new(),
        }
    }

    fn score(&mut self, text: &str) -> Option<u16> {
        let haystack = Utf32Str::new(text, &mut self.haystack_buf);
        let needle = Utf32Str::new(&self.needle, &mut self.needle_buf);
        self.matcher.fuzzy_match(haystack, needle)
    }

    fn filter_level(&mut self, nodes: &[TreeNode], parent: &str) -> Vec<TreeNode> {
        let mut kept = Vec::new();
        for node in nodes {
            let relative = if parent.is_empty() {
                node.name.clone()
            } else {
                format!("{}/{}", parent, node.name)
            };
            if node.is_dir() {
                if self.score(&node.name).is_some() {
                    kept.push(node.clone());
                    continue;
                }
                let children = self.filter_level(&node.children, &relative);
                if !children.is_empty() {
                    let mut dir = node.clone();
                    dir.children = children;
                    kept.push(dir);
                }
            } else if self.score(&relative).is_some() {
                kept.push(node.clone());
            }
        }
        kept
    }
}
