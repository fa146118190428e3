//! File persistence helpers.
//!
//! Settings are small JSON documents written with owner-only permissions.

use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::StoreError;

/// Directory name under the platform config directory.
const APP_DIR: &str = "usagebar";

// ============================================================================
// Default Paths
// ============================================================================

/// Returns the default configuration directory.
///
/// - macOS: `~/Library/Application Support/usagebar`
/// - Linux: `~/.config/usagebar`
/// - Windows: `%APPDATA%\usagebar`
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|c| c.join(APP_DIR))
}

/// Returns the default settings file path.
pub fn default_settings_path() -> Option<PathBuf> {
    default_config_dir().map(|d| d.join("settings.json"))
}

// ============================================================================
// Security: File Permissions
// ============================================================================

/// Sets owner-only permissions (`mode`) on Unix systems.
#[cfg(unix)]
async fn set_mode(path: &Path, mode: u32) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_mode(mode);
    tokio::fs::set_permissions(path, perms).await?;

    debug!(path = %path.display(), mode = format!("{mode:o}"), "Set restrictive permissions");
    Ok(())
}

/// No-op for non-Unix systems.
#[cfg(not(unix))]
async fn set_mode(_path: &Path, _mode: u32) -> Result<(), StoreError> {
    Ok(())
}

// ============================================================================
// File Operations
// ============================================================================

/// Ensures a directory exists. Newly created directories get 0700.
///
/// # Errors
///
/// Returns `StoreError::Io` if the directory cannot be created.
pub async fn ensure_dir(path: &Path) -> Result<(), StoreError> {
    if !path.exists() {
        debug!(path = %path.display(), "Creating directory");
        tokio::fs::create_dir_all(path).await?;
        set_mode(path, 0o700).await?;
    }
    Ok(())
}

/// Saves data to a JSON file with secure permissions.
///
/// Creates the parent directory if needed, writes through a temp file and
/// rename, then restricts the file to 0600 on Unix.
///
/// # Errors
///
/// Returns `StoreError` on serialization or IO failure.
pub async fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<(), StoreError> {
    debug!(path = %path.display(), "Saving JSON file");

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent).await?;
    }

    let json = serde_json::to_string_pretty(data)?;

    let temp_path = path.with_extension("json.tmp");
    tokio::fs::write(&temp_path, &json).await?;
    set_mode(&temp_path, 0o600).await?;
    tokio::fs::rename(&temp_path, path).await?;

    debug!(path = %path.display(), "JSON file saved");
    Ok(())
}

/// Loads data from a JSON file.
///
/// # Errors
///
/// Returns `StoreError::Io` if the file cannot be read and
/// `StoreError::Serialization` if it does not parse.
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    debug!(path = %path.display(), "Loading JSON file");

    let content = tokio::fs::read_to_string(path).await?;
    let data = serde_json::from_str(&content)?;

    Ok(data)
}

/// Loads data from a JSON file, returning the default if it does not exist.
///
/// # Errors
///
/// A file that exists but cannot be read or parsed is still an error.
pub async fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StoreError> {
    match load_json(path).await {
        Ok(data) => Ok(data),
        Err(e) if e.is_not_found() => {
            debug!(path = %path.display(), "File not found, using defaults");
            Ok(T::default())
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to load file");
            Err(e)
        }
    }
}
