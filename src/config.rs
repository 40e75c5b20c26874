//! Configuration management and validation.
//!
//! Provides the import configuration: write batch size, how existing names
//! are refreshed, what happens to rows that fail validation, and where the
//! CLI keeps its database, blob root and drafts.

use crate::constants::{APP_DIR_NAME, DEFAULT_BATCH_SIZE, DEFAULT_DATABASE_FILE};
use crate::{ImportError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// When an import may overwrite a stored qualification or unit name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameUpdatePolicy {
    /// Overwrite with any non-empty name that differs from the stored one
    #[default]
    PreferNewest,
    /// Only replace names that are empty or just repeat the code
    FillIfBlank,
    /// Never touch existing names
    Never,
}

impl NameUpdatePolicy {
    pub fn should_replace(&self, current: &str, incoming: &str, code: &str) -> bool {
        if incoming.is_empty() || incoming == current {
            return false;
        }
        match self {
            NameUpdatePolicy::PreferNewest => true,
            NameUpdatePolicy::FillIfBlank => current.is_empty() || current == code,
            NameUpdatePolicy::Never => false,
        }
    }
}

/// What to do with rows that fail validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidRowPolicy {
    /// Import only the valid rows
    #[default]
    Skip,
    /// Import every retained row regardless of errors
    Include,
    /// Refuse the whole import when any row is invalid
    Abort,
}

/// Main import configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Rows per store write
    pub batch_size: usize,

    pub name_policy: NameUpdatePolicy,

    pub invalid_rows: InvalidRowPolicy,

    /// SQLite database used by the CLI
    pub database_path: PathBuf,

    /// Directory standing in for the blob bucket root
    pub blob_root: PathBuf,

    /// Directory holding saved paste drafts
    pub draft_dir: PathBuf,
}

/// Per-user data directory for the importer
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

impl Default for ImportConfig {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            name_policy: NameUpdatePolicy::default(),
            invalid_rows: InvalidRowPolicy::default(),
            database_path: data_dir.join(DEFAULT_DATABASE_FILE),
            blob_root: data_dir.join("blobs"),
            draft_dir: data_dir.join("drafts"),
        }
    }
}

impl ImportConfig {
    /// Load from a JSON file; missing keys take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: ImportConfig = serde_json::from_str(&text)?;
        debug!("Loaded configuration from {}", path.display());
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ImportError::configuration("batch_size must be at least 1"));
        }
        if self.database_path.as_os_str().is_empty() {
            return Err(ImportError::configuration("database_path must not be empty"));
        }
        Ok(())
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_name_policy(mut self, policy: NameUpdatePolicy) -> Self {
        self.name_policy = policy;
        self
    }

    pub fn with_invalid_rows(mut self, policy: InvalidRowPolicy) -> Self {
        self.invalid_rows = policy;
        self
    }

    pub fn with_database_path(mut self, path: PathBuf) -> Self {
        self.database_path = path;
        self
    }

    pub fn with_blob_root(mut self, path: PathBuf) -> Self {
        self.blob_root = path;
        self
    }

    pub fn with_draft_dir(mut self, path: PathBuf) -> Self {
        self.draft_dir = path;
        self
    }
}
