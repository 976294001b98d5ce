//! Tree Engine
//!
//! Builds an ordered snapshot of the workspace, overlays git status, applies the
//! fuzzy name filter and flattens the result into visible rows.

mod builder;
mod filter;
mod flatten;
mod node;
mod overlay;

pub use builder::{build, build_async, compare_nodes, compile_globs, TreeBuilder};
pub use filter::{filter_by_name, fuzzy_score};
pub use flatten::{flatten, index_of, FlattenedNode};
pub use node::{count_nodes, directory_paths, find_node, walk_nodes, NodeKind, TreeNode};
pub use overlay::{attach_git_status, StatusOverlay};
