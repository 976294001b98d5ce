//! ConfigLoader: composes file and environment sources into an ArborConfig.

use super::paths;
use super::ArborConfig;
use crate::error::ArborError;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use std::path::Path;
use tracing::debug;

/// Environment prefix; nested keys use `__`, e.g. `ARBOR__GIT__DEBOUNCE_MS`.
const ENV_PREFIX: &str = "ARBOR";

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence: defaults (lowest) -> global file -> workspace file -> environment (highest).
    pub fn load(workspace_root: &Path) -> Result<ArborConfig, ArborError> {
        let mut builder = Config::builder();
        if let Some(global) = paths::global_config_path() {
            debug!(path = %global.display(), "Adding global config source");
            builder = builder.add_source(File::from(global).format(FileFormat::Toml).required(false));
        }
        let workspace = paths::workspace_config_path(workspace_root);
        debug!(path = %workspace.display(), "Adding workspace config source");
        builder = builder.add_source(File::from(workspace).format(FileFormat::Toml).required(false));
        Self::finish(with_environment(builder))
    }

    /// Load configuration from a specific file with environment overlay.
    pub fn load_from_file(path: &Path) -> Result<ArborConfig, ArborError> {
        if !path.exists() {
            return Err(ArborError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let builder = Config::builder()
            .add_source(File::from(path.to_path_buf()).format(FileFormat::Toml).required(true));
        Self::finish(with_environment(builder))
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<ArborConfig, ArborError> {
        let config: ArborConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

fn with_environment(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    )
}
