//! Configuration loading and management
//!
//! Handles parsing of `.taskpad.toml` configuration files.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::storage::{validate_key, DEFAULT_STORAGE_KEY};
use crate::undo::UndoPolicy;
use crate::view::{Filter, SortBy, SortOrder, ViewCriteria};

/// Name of the per-directory configuration file
pub const CONFIG_FILE: &str = ".taskpad.toml";

/// Fallback data directory when the platform offers none
pub const FALLBACK_DATA_DIR: &str = ".taskpad";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Where and under which key tasks are stored
    #[serde(default)]
    pub storage: StorageConfig,

    /// Initial view criteria
    #[serde(default)]
    pub view: ViewConfig,

    /// Undo behaviour
    #[serde(default)]
    pub undo: UndoConfig,
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory; platform data dir when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Key the task collection is stored under
    #[serde(default = "default_key")]
    pub key: String,
}

fn default_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: None,
            key: default_key(),
        }
    }
}

impl StorageConfig {
    /// Configured directory, or the platform data directory.
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(default_data_dir)
    }
}

/// Platform data directory for taskpad (e.g. `~/.local/share/taskpad`).
pub fn default_data_dir() -> PathBuf {
    ProjectDirs::from("", "", "taskpad")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(FALLBACK_DATA_DIR))
}

/// View configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default)]
    pub filter: Filter,

    #[serde(default)]
    pub sort_by: SortBy,

    #[serde(default)]
    pub sort_order: SortOrder,
}

impl ViewConfig {
    pub fn criteria(&self) -> ViewCriteria {
        ViewCriteria::default()
            .with_filter(self.filter)
            .with_sorting(self.sort_by, self.sort_order)
    }
}

/// Undo configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoConfig {
    /// `clear` empties the slot after undoing a create/toggle; `chain` keeps
    /// the record the revert produced
    #[serde(default)]
    pub policy: UndoPolicy,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `.taskpad.toml` from `dir`, or return defaults
    pub fn load_from_dir(dir: &Path) -> Self {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path).unwrap_or_else(|err| {
                tracing::warn!(path = %config_path.display(), error = %err, "ignoring invalid config");
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> crate::error::Result<()> {
        validate_key(&self.storage.key).map_err(|err| {
            crate::error::Error::InvalidConfig(format!("storage.key: {err}"))
        })?;
        if let Some(dir) = &self.storage.dir {
            if dir.as_os_str().is_empty() {
                return Err(crate::error::Error::InvalidConfig(
                    "storage.dir cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
