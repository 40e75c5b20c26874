//! Blob storage for uploaded import files

use crate::{ImportError, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Source of uploaded files (allows mocking for tests)
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// File contents, or `None` when the object does not exist
    async fn download(&self, bucket: &str, path: &str) -> Result<Option<Vec<u8>>>;
}

/// Buckets as sub-directories of a local root
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve `bucket/path` under the root, refusing anything that escapes it
    pub fn resolve(&self, bucket: &str, path: &str) -> Result<PathBuf> {
        let mut resolved = self.root.clone();
        for part in [bucket, path] {
            let relative = Path::new(part);
            let safe = relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
            if !safe || part.is_empty() {
                return Err(ImportError::InvalidBlobPath {
                    path: format!("{bucket}/{path}"),
                });
            }
            resolved.push(relative);
        }
        Ok(resolved)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn download(&self, bucket: &str, path: &str) -> Result<Option<Vec<u8>>> {
        let file = self.resolve(bucket, path)?;
        match fs::read(&file).await {
            Ok(bytes) => {
                debug!("Read {} bytes from {}", bytes.len(), file.display());
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
