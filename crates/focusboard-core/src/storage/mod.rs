mod config;
pub mod database;
pub mod migrations;

pub use config::{BoardConfig, Config, LogConfig, TimerConfig};
pub use database::Database;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Overrides the data directory entirely.
pub const DATA_DIR_ENV: &str = "FOCUSBOARD_DATA_DIR";
/// `dev` selects the development data directory.
pub const ENV_ENV: &str = "FOCUSBOARD_ENV";

/// Returns the data directory, creating it if needed.
///
/// `FOCUSBOARD_DATA_DIR` wins when set. Otherwise the directory is
/// `~/.config/focusboard`, or `~/.config/focusboard-dev` with
/// `FOCUSBOARD_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os(DATA_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var(ENV_ENV).unwrap_or_default();
            if env == "dev" {
                base_dir.join("focusboard-dev")
            } else {
                base_dir.join("focusboard")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
