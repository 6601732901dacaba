//! Local-disk blob store

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

use super::{BlobReader, BlobStore};

/// Blob store rooted at a directory on the local filesystem
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a blob path under the root, rejecting absolute paths and
    /// parent-directory traversal.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        for component in relative.components() {
            match component {
                Component::Normal(_) => {},
                _ => bail!("invalid blob path: {path}"),
            }
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn exists(&self, path: &str) -> Result<bool> {
        let full = self.resolve(path)?;
        Ok(tokio::fs::try_exists(&full).await.unwrap_or(false))
    }

    async fn open(&self, path: &str) -> Result<BlobReader> {
        let full = self.resolve(path)?;
        let file = tokio::fs::File::open(&full)
            .await
            .with_context(|| format!("failed to open blob: {}", full.display()))?;
        Ok(Box::new(file))
    }

    async fn put(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create blob directory: {}", parent.display()))?;
        }
        tokio::fs::write(&full, bytes)
            .await
            .with_context(|| format!("failed to write blob: {}", full.display()))?;
        Ok(())
    }
}
