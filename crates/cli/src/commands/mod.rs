pub mod config_cmd;
pub mod cycle;
pub mod doctor;
pub mod serve;

use opsweave_config::{AppConfig, ConfigError};
use std::path::{Path, PathBuf};

/// The config file in use: the `--config` override or the default location.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

/// Load, apply environment overrides and validate.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    AppConfig::load_with_env(&config_path(explicit))
}
