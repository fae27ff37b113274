mod config;

pub use config::{AppSettings, Config, MAX_OVERLAY_TRANSPARENCY_PERCENT};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/restcue[-dev]/` based on RESTCUE_ENV.
///
/// Set RESTCUE_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("RESTCUE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("restcue-dev")
    } else {
        base_dir.join("restcue")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
