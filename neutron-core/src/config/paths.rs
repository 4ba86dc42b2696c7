//! Default path resolution for configuration files
//!
//! Uses XDG Base Directory specification when available, with sensible fallbacks.

use super::clouds::CLOUDS_FILE_ENV;
use std::path::PathBuf;

/// Returns the directory holding the client's configuration files.
///
/// - Linux/macOS: `~/.config/neutron`
/// - Fallback: `/etc/neutron`
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/etc"))
        .join("neutron")
}

/// Returns the path of the cloud profiles file.
///
/// `NEUTRON_CLOUDS_FILE` wins over the default location.
pub fn default_clouds_path() -> PathBuf {
    match std::env::var_os(CLOUDS_FILE_ENV) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => default_config_dir().join("clouds.toml"),
    }
}

/// Returns the path of the CLI preferences file.
pub fn default_cli_config_path() -> PathBuf {
    default_config_dir().join("cli.toml")
}
