//! Engine configuration: loads optional ~/.grammar-school/config.yaml.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the default [`PrintRuntime`](crate::runtime::PrintRuntime) renders actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrintFormat {
    #[default]
    Text,
    Json,
}

/// Static engine settings, read once when an engine is built.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Stream channel capacity. `None` means unbounded.
    #[serde(default)]
    pub stream_capacity: Option<usize>,
    /// tracing filter used by the `gs` binary.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default)]
    pub print_format: PrintFormat,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stream_capacity: None,
            log_filter: default_log_filter(),
            print_format: PrintFormat::default(),
        }
    }
}

fn default_log_filter() -> String {
    "warn".to_string()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),
    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Get the config file path.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".grammar-school").join("config.yaml"))
}

/// Load configuration from ~/.grammar-school/config.yaml.
/// Returns None if the file doesn't exist or can't be read.
pub fn load_config() -> Option<EngineConfig> {
    let path = config_path()?;
    load_from(&path).ok()
}

/// Load configuration from an explicit path.
pub fn load_from(path: &Path) -> Result<EngineConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}
