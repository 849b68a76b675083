//! Platform-specific path utilities for kongctl.

use std::path::PathBuf;

use crate::error::{KongctlError, Result};

/// Get the configuration directory for kongctl.
///
/// - Linux: `$XDG_CONFIG_HOME/kongctl` or `~/.config/kongctl`
/// - macOS: `~/Library/Application Support/kongctl`
/// - Windows: `%APPDATA%\kongctl`
pub fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir()
        .ok_or_else(|| KongctlError::Config("Cannot determine config directory".to_string()))?;
    Ok(base.join("kongctl"))
}

/// Get the default configuration file path.
///
/// Credential files are stored in the same directory.
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}
