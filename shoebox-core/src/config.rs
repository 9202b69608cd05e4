//! Process-wide configuration.
//!
//! One small JSON document at `~/.shoebox/config.json`: the backup drive,
//! the storage-root override, and the main-computer designation. Loaded
//! once at startup into an explicit [`Config`] object with an explicit
//! [`Config::reload`]; nothing re-reads the file per call. Writes are
//! best-effort single-document saves, no lock protocol.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Per-user application directory under the home directory. Doubles as the
/// default storage root.
pub const APP_DIR: &str = ".shoebox";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The machine designated as canonical storage host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainComputer {
    pub id: String,
    pub name: String,
    pub set_at: DateTime<Utc>,
}

/// JSON document persisted at the config path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    backup_drive: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_storage_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    main_computer: Option<MainComputer>,
}

/// Application configuration, constructed at startup and passed into the
/// catalog/pipeline explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    config_path: PathBuf,
    pub backup_drive: Option<PathBuf>,
    pub custom_storage_path: Option<PathBuf>,
    pub main_computer: Option<MainComputer>,
}

impl Config {
    /// Default per-user config directory: `~/.shoebox`.
    pub fn default_config_dir() -> PathBuf {
        dirs::home_dir()
            .expect("Failed to get home directory")
            .join(APP_DIR)
    }

    /// Load from a config file. A missing or corrupt document yields
    /// defaults; first run looks exactly like a wiped config.
    pub fn load(config_path: PathBuf) -> Self {
        let file = match std::fs::read_to_string(&config_path) {
            Ok(contents) => match serde_json::from_str::<ConfigFile>(&contents) {
                Ok(file) => file,
                Err(e) => {
                    warn!(
                        "Config at {} is unreadable ({}), using defaults",
                        config_path.display(),
                        e
                    );
                    ConfigFile::default()
                }
            },
            Err(_) => ConfigFile::default(),
        };

        Self {
            config_path,
            backup_drive: file.backup_drive,
            custom_storage_path: file.custom_storage_path,
            main_computer: file.main_computer,
        }
    }

    /// Re-read the backing document, replacing in-memory state.
    pub fn reload(&mut self) {
        *self = Self::load(self.config_path.clone());
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = ConfigFile {
            backup_drive: self.backup_drive.clone(),
            custom_storage_path: self.custom_storage_path.clone(),
            main_computer: self.main_computer.clone(),
        };
        std::fs::write(&self.config_path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    /// Directory holding the config document (and the machine-id file).
    pub fn config_dir(&self) -> &Path {
        self.config_path.parent().unwrap_or(Path::new("."))
    }

    /// Effective storage root: the custom override when set, otherwise the
    /// default app directory.
    pub fn storage_root(&self) -> PathBuf {
        match &self.custom_storage_path {
            Some(path) => path.clone(),
            None => Self::default_config_dir(),
        }
    }
}
