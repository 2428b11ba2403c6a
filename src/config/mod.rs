mod types;

pub use types::*;

use crate::error::{BackupError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".yorokobi"))
        .unwrap_or_else(|| PathBuf::from(".yorokobi"))
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

pub fn load_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let contents = fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&contents)?;
    Ok(config)
}

pub fn save_to(config: &AppConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            info!("Creating config directory: {:?}", parent);
            fs::create_dir_all(parent)?;
        }
    }

    let contents = toml::to_string_pretty(config)
        .map_err(|e| BackupError::Serialization(e.to_string()))?;

    write_private(path, contents.as_bytes())?;
    info!("Configuration saved to {:?}", path);
    Ok(())
}

// The file holds the repository password.
#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies to newly created files.
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(contents)?;
    Ok(())
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    fs::write(path, contents)?;
    Ok(())
}
