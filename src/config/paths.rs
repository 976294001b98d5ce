//! XDG Base Directory lookups for configuration files.

use std::path::{Path, PathBuf};

/// Name of the per-workspace configuration file.
pub const WORKSPACE_CONFIG_FILE: &str = ".arbor.toml";

/// Get XDG config home directory
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise defaults to `$HOME/.config`
pub fn config_home() -> Option<PathBuf> {
    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg_config_home.is_empty() {
            return Some(PathBuf::from(xdg_config_home));
        }
    }

    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".config"))
}

/// `$XDG_CONFIG_HOME/arbor/config.toml`
pub fn global_config_path() -> Option<PathBuf> {
    config_home().map(|home| home.join("arbor").join("config.toml"))
}

pub fn workspace_config_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(WORKSPACE_CONFIG_FILE)
}
