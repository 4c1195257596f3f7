//! License key persistence
//!
//! A single trimmed key in a plain text file under the per-user config
//! directory. No format beyond that.

use anyhow::Context;
use once_cell::sync::Lazy;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const LICENSE_DIR: &str = "aic";
const LICENSE_FILE: &str = "aic-sdk-license.txt";

static DEFAULT_LICENSE_PATH: Lazy<Option<PathBuf>> =
    Lazy::new(|| dirs::config_dir().map(|d| d.join(LICENSE_DIR).join(LICENSE_FILE)));

#[derive(Debug, Error)]
pub enum LicenseError {
    #[error("no per-user config directory on this system")]
    NoConfigDir,
    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct LicenseStore {
    path: Option<PathBuf>,
}

impl Default for LicenseStore {
    fn default() -> Self {
        Self {
            path: DEFAULT_LICENSE_PATH.clone(),
        }
    }
}

impl LicenseStore {
    /// Store backed by an explicit file.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Where the key is (or would be) stored.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Human readable location for the license panel.
    pub fn display_path(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<no config directory>".to_string())
    }

    /// Read the persisted key. Missing file, unreadable file and an empty key
    /// all read as `None`.
    pub fn load(&self) -> Option<String> {
        let path = self.path.as_ref()?;
        if !path.is_file() {
            log::info!("License file not found at {}", path.display());
            return None;
        }
        match fs::read_to_string(path) {
            Ok(raw) => {
                let key = raw.trim();
                if key.is_empty() {
                    None
                } else {
                    Some(key.to_string())
                }
            }
            Err(e) => {
                log::warn!("Failed to read license file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Persist `key` (trimmed), replacing any existing file.
    pub fn save(&self, key: &str) -> Result<(), LicenseError> {
        let path = self.path.as_ref().ok_or(LicenseError::NoConfigDir)?;
        write_key(path, key.trim())?;
        log::info!("License key saved to {}", path.display());
        Ok(())
    }
}

fn write_key(path: &Path, key: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating license directory {}", parent.display()))?;
    }
    if path.exists() {
        fs::remove_file(path)
            .with_context(|| format!("removing old license file {}", path.display()))?;
    }
    fs::write(path, key).with_context(|| format!("writing license file {}", path.display()))?;
    Ok(())
}
