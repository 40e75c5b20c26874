//! Saved paste drafts
//!
//! A draft keeps the last pasted grid together with the operator defaults
//! typed alongside it, one JSON file per draft name. Drafts live outside the
//! import pipeline; nothing in parsing or reconciliation reads them.

use crate::models::RecordDefaults;
use crate::{ImportError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub paste_text: String,
    #[serde(default)]
    pub rto_code: Option<String>,
    #[serde(default)]
    pub qualification_code: Option<String>,
    #[serde(default)]
    pub qualification_name: Option<String>,
    pub saved_at: DateTime<Utc>,
}

impl Draft {
    pub fn new(paste_text: impl Into<String>, defaults: &RecordDefaults) -> Self {
        Self {
            paste_text: paste_text.into(),
            rto_code: defaults.rto_code.clone(),
            qualification_code: defaults.qualification_code.clone(),
            qualification_name: defaults.qualification_name.clone(),
            saved_at: Utc::now(),
        }
    }

    /// Operator defaults saved with the paste
    pub fn defaults(&self) -> RecordDefaults {
        RecordDefaults {
            qualification_code: self.qualification_code.clone(),
            qualification_name: self.qualification_name.clone(),
            rto_code: self.rto_code.clone(),
        }
    }
}

/// JSON drafts under one directory
#[derive(Debug, Clone)]
pub struct DraftStore {
    dir: PathBuf,
}

impl DraftStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(ImportError::configuration(format!(
                "invalid draft name '{name}'"
            )));
        }
        Ok(self.dir.join(format!("{name}.json")))
    }

    /// Load a draft; a missing or unreadable file counts as no draft
    pub async fn load(&self, name: &str) -> Result<Option<Draft>> {
        let path = self.path_for(name)?;
        let text = match fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&text) {
            Ok(draft) => Ok(Some(draft)),
            Err(e) => {
                warn!("Ignoring corrupt draft {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    pub async fn save(&self, name: &str, draft: &Draft) -> Result<()> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_string_pretty(draft)?;
        fs::write(&path, json).await?;
        debug!("Saved draft {} ({} bytes of paste)", name, draft.paste_text.len());
        Ok(())
    }

    /// Remove a draft, returning whether one existed
    pub async fn clear(&self, name: &str) -> Result<bool> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
