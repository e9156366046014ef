//! Notebook configuration file.
//!
//! ```toml
//! [database]
//! path = "/home/me/.local/share/aen/aen.db"
//! read_only = false
//!
//! [keyfile]
//! path = "/home/me/.config/aen/aen.key"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AenError, Result};
use crate::fs::write_atomic;

const APP_DIR: &str = "aen";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotebookConfig {
    pub database: DatabaseSection,
    #[serde(default)]
    pub keyfile: KeyfileSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub path: String,
    #[serde(default)]
    pub read_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct KeyfileSection {
    pub path: Option<String>,
}

impl NotebookConfig {
    pub fn new(database_path: PathBuf, keyfile_path: Option<PathBuf>) -> Self {
        Self {
            database: DatabaseSection {
                path: database_path.to_string_lossy().to_string(),
                read_only: false,
            },
            keyfile: KeyfileSection {
                path: keyfile_path.map(|path| path.to_string_lossy().to_string()),
            },
        }
    }

    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.database.path)
    }

    pub fn keyfile_path(&self) -> Option<PathBuf> {
        self.keyfile.path.as_ref().map(PathBuf::from)
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(xdg_config_dir()?.join("config.toml"))
}

pub fn default_database_path() -> Result<PathBuf> {
    Ok(xdg_data_dir()?.join("aen.db"))
}

pub fn default_keyfile_path() -> Result<PathBuf> {
    Ok(xdg_config_dir()?.join("aen.key"))
}

pub fn read_config(path: &Path) -> Result<NotebookConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        AenError::Config(format!("Failed to read config {}: {}", path.display(), e))
    })?;
    toml::from_str(&contents).map_err(|e| {
        AenError::Config(format!("Failed to parse config {}: {}", path.display(), e))
    })
}

pub fn write_config(path: &Path, config: &NotebookConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            AenError::Config(format!(
                "Failed to create config directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }
    let contents = toml::to_string_pretty(config)
        .map_err(|e| AenError::Config(format!("TOML error: {}", e)))?;
    write_atomic(path, contents.as_bytes(), false).map_err(|e| {
        AenError::Config(format!("Failed to write config {}: {}", path.display(), e))
    })?;
    tracing::debug!(path = %path.display(), "config written");
    Ok(())
}

pub fn xdg_config_dir() -> Result<PathBuf> {
    app_dir(std::env::var("XDG_CONFIG_HOME").ok(), &[".config"])
}

pub fn xdg_data_dir() -> Result<PathBuf> {
    app_dir(std::env::var("XDG_DATA_HOME").ok(), &[".local", "share"])
}

fn app_dir(xdg_value: Option<String>, home_fallback: &[&str]) -> Result<PathBuf> {
    if let Some(value) = xdg_value {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join(APP_DIR));
        }
    }
    let mut dir = home_dir()?;
    dir.extend(home_fallback);
    Ok(dir.join(APP_DIR))
}

fn home_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").map_err(|_| {
        AenError::Config("HOME is not set; cannot resolve default paths".to_string())
    })?;
    Ok(PathBuf::from(home))
}
