//! Finder configuration
//!
//! Loaded from `.declaration_finder/config.json`; missing or malformed files
//! fall back to defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::error::{FinderError, Result};

/// Configuration for the declaration finder
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FinderConfig {
    /// Directory for persisted symbol indexes (None = keep them in memory only)
    #[serde(default)]
    pub index_cache_dir: Option<PathBuf>,
    /// Write freshly built indexes to `index_cache_dir`
    #[serde(default = "default_persist_indexes")]
    pub persist_indexes: bool,
    /// Persisted indexes older than this are rebuilt
    #[serde(default = "default_max_index_age_hours")]
    pub max_index_age_hours: u64,
}

fn default_persist_indexes() -> bool {
    true
}

fn default_max_index_age_hours() -> u64 {
    168 // one week
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            index_cache_dir: None,
            persist_indexes: default_persist_indexes(),
            max_index_age_hours: default_max_index_age_hours(),
        }
    }
}

impl FinderConfig {
    /// Use `dir` for persisted indexes
    pub fn with_index_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.index_cache_dir = Some(dir.into());
        self
    }

    /// Per-user cache location, if the platform has one
    pub fn default_cache_dir() -> Option<PathBuf> {
        dirs::cache_dir().map(|dir| dir.join("declaration_finder").join("indexes"))
    }

    /// Load from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load from file path, returning default if file doesn't exist or is malformed
    pub fn load_from_file(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_json(&content).unwrap_or_else(|err| {
                tracing::warn!(path = %path.display(), error = %err, "ignoring invalid config");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save to file path
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Get the default config path for a workspace
    pub fn default_path(workspace_root: &Path) -> PathBuf {
        workspace_root.join(".declaration_finder").join("config.json")
    }

    fn validate(&self) -> Result<()> {
        if self.max_index_age_hours == 0 {
            return Err(FinderError::invalid_config(
                "max_index_age_hours must be positive",
            ));
        }
        Ok(())
    }
}
