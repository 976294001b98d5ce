//! Logging System
//!
//! Structured logging using the `tracing` crate. Levels, format, and destination come
//! from environment variables, then configuration, then defaults. The default
//! destination is a file so a full-screen renderer owning the terminal is never
//! interleaved with log lines.

use crate::error::ArborError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// Resolve the log file path with precedence: CLI, ARBOR_LOG_FILE env, config file, default.
///
/// The default lives under the platform state directory, scoped by workspace path when given.
pub fn resolve_log_file_path(
    cli_file: Option<PathBuf>,
    config_file: Option<PathBuf>,
    workspace: Option<&Path>,
) -> Result<PathBuf, ArborError> {
    if let Some(p) = cli_file.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(p);
    }
    if let Ok(env_path) = std::env::var("ARBOR_LOG_FILE") {
        if !env_path.is_empty() {
            return Ok(PathBuf::from(env_path));
        }
    }
    if let Some(p) = config_file.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(p);
    }
    default_log_file_path(workspace)
}

fn default_log_file_path(workspace: Option<&Path>) -> Result<PathBuf, ArborError> {
    let project_dirs = directories::ProjectDirs::from("", "arbor", "arbor").ok_or_else(|| {
        ArborError::ConfigError("Could not determine platform directories for log file".to_string())
    })?;
    let mut dir = project_dirs
        .state_dir()
        .unwrap_or_else(|| project_dirs.cache_dir())
        .to_path_buf();
    if let Some(ws) = workspace {
        let canonical = dunce::canonicalize(ws).map_err(|e| {
            ArborError::ConfigError(format!("Failed to canonicalize workspace path: {}", e))
        })?;
        for component in canonical.components() {
            if let std::path::Component::Normal(name) = component {
                dir = dir.join(name);
            }
        }
    }
    Ok(dir.join("arbor.log"))
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Whether logging is enabled (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text (default: text)
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: stdout, stderr, file, file+stderr, both
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path when output includes file; None means use runtime default
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Enable colored output (text format, terminal destinations only)
    #[serde(default = "default_true")]
    pub color: bool,

    /// Module-specific log levels
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "file".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            file: None,
            color: default_true(),
            modules: HashMap::new(),
        }
    }
}

impl LoggingConfig {
    /// Apply command-line overrides on top of the loaded configuration. The log
    /// file flag is not one of them; it goes to [`init_logging`] directly so it
    /// outranks `ARBOR_LOG_FILE`.
    pub fn with_overrides(
        mut self,
        level: Option<String>,
        format: Option<String>,
        output: Option<String>,
    ) -> Self {
        if let Some(level) = level {
            self.level = level;
        }
        if let Some(format) = format {
            self.format = format;
        }
        if let Some(output) = output {
            self.output = output;
        }
        self
    }
}

/// Initialize the global subscriber.
///
/// Priority order (highest to lowest):
/// 1. Environment variables (ARBOR_LOG, ARBOR_LOG_FORMAT, ARBOR_LOG_OUTPUT, ARBOR_LOG_MODULES)
/// 2. Configuration (including CLI overrides already applied to it)
/// 3. Defaults
///
/// The log file follows [`resolve_log_file_path`], with `cli_file` first.
pub fn init_logging(
    config: Option<&LoggingConfig>,
    cli_file: Option<&Path>,
    workspace: Option<&Path>,
) -> Result<(), ArborError> {
    if config.map(|c| !c.enabled).unwrap_or(false) {
        return Registry::default()
            .with(EnvFilter::new("off"))
            .try_init()
            .map_err(|e| ArborError::ConfigError(format!("Failed to install subscriber: {}", e)));
    }

    let filter = build_env_filter(config)?;
    let format = determine_format(config)?;
    let output = determine_output(config)?;
    let use_color = config.map(|c| c.color).unwrap_or(true);

    let writer = if output.file {
        let path = log_file_for(config, cli_file, workspace)?;
        let file = Arc::new(open_log_file(&path)?);
        if output.stderr {
            BoxMakeWriter::new(file.and(std::io::stderr))
        } else {
            BoxMakeWriter::new(file)
        }
    } else if output.stdout && output.stderr {
        BoxMakeWriter::new(std::io::stdout.and(std::io::stderr))
    } else if output.stderr {
        BoxMakeWriter::new(std::io::stderr)
    } else {
        BoxMakeWriter::new(std::io::stdout)
    };

    let layer: Box<dyn Layer<Registry> + Send + Sync> = if format == LogFormat::Json {
        fmt::layer()
            .json()
            .with_target(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_writer(writer)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(use_color && !output.file)
            .with_writer(writer)
            .boxed()
    };

    Registry::default()
        .with(layer)
        .with(filter)
        .try_init()
        .map_err(|e| ArborError::ConfigError(format!("Failed to install subscriber: {}", e)))
}

fn log_file_for(
    config: Option<&LoggingConfig>,
    cli_file: Option<&Path>,
    workspace: Option<&Path>,
) -> Result<PathBuf, ArborError> {
    resolve_log_file_path(
        cli_file.map(Path::to_path_buf),
        config.and_then(|c| c.file.clone()),
        workspace,
    )
}

fn open_log_file(path: &Path) -> Result<std::fs::File, ArborError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ArborError::ConfigError(format!("Failed to create log directory: {}", e))
        })?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ArborError::ConfigError(format!("Failed to open log file {:?}: {}", path, e)))
}

/// Build environment filter from config or environment variables
fn build_env_filter(config: Option<&LoggingConfig>) -> Result<EnvFilter, ArborError> {
    if let Ok(filter) = EnvFilter::try_from_env("ARBOR_LOG") {
        return Ok(filter);
    }

    let level = config.map(|c| c.level.as_str()).unwrap_or("info");
    if level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    let mut directives: Vec<String> = Vec::new();
    if let Some(config) = config {
        directives.extend(
            config
                .modules
                .iter()
                .map(|(module, module_level)| format!("{}={}", module, module_level)),
        );
    }
    if let Ok(modules) = std::env::var("ARBOR_LOG_MODULES") {
        directives.extend(modules.split(',').filter_map(|directive| {
            let (module, module_level) = directive.split_once('=')?;
            Some(format!("{}={}", module.trim(), module_level.trim()))
        }));
    }

    let mut filter = EnvFilter::new(level);
    for directive in directives {
        filter = filter.add_directive(
            directive
                .parse()
                .map_err(|e| ArborError::ConfigError(format!("Invalid log directive '{}': {}", directive, e)))?,
        );
    }
    Ok(filter)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

fn determine_format(config: Option<&LoggingConfig>) -> Result<LogFormat, ArborError> {
    if let Ok(format) = std::env::var("ARBOR_LOG_FORMAT") {
        if let Ok(parsed) = parse_format(&format) {
            return Ok(parsed);
        }
    }
    parse_format(config.map(|c| c.format.as_str()).unwrap_or("text"))
}

fn parse_format(format: &str) -> Result<LogFormat, ArborError> {
    match format {
        "text" => Ok(LogFormat::Text),
        "json" => Ok(LogFormat::Json),
        other => Err(ArborError::ConfigError(format!(
            "Invalid log format: {} (must be 'json' or 'text')",
            other
        ))),
    }
}

/// Output destinations
#[derive(Debug)]
struct OutputDestinations {
    stdout: bool,
    stderr: bool,
    file: bool,
}

fn determine_output(config: Option<&LoggingConfig>) -> Result<OutputDestinations, ArborError> {
    if let Ok(output) = std::env::var("ARBOR_LOG_OUTPUT") {
        return parse_output_destinations(&output);
    }
    parse_output_destinations(config.map(|c| c.output.as_str()).unwrap_or("file"))
}

fn parse_output_destinations(output: &str) -> Result<OutputDestinations, ArborError> {
    let (stdout, stderr, file) = match output {
        "stdout" => (true, false, false),
        "stderr" => (false, true, false),
        "file" => (false, false, true),
        "file+stderr" => (false, true, true),
        "both" => (true, true, false),
        _ => {
            return Err(ArborError::ConfigError(format!(
                "Invalid log output: {} (must be 'stdout', 'stderr', 'file', 'file+stderr', or 'both')",
                output
            )))
        }
    };
    Ok(OutputDestinations { stdout, stderr, file })
}
