//! JSON document store for the item collection.
//!
//! The whole collection lives in one pretty-printed JSON array. Reads parse the
//! full document; writes serialize the full collection into a temporary file in
//! the same directory and rename it over the document, so readers (including
//! the stats watcher) never observe a half-written document.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::time::timeout;
use tracing::{debug, info, instrument};

use crate::application::repos::{ItemsRepo, RepoError};
use crate::domain::items::Item;

use super::error::InfraError;

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    io_timeout: Duration,
}

impl JsonFileStore {
    /// Open the document, creating an empty collection when it does not exist.
    pub async fn open(path: impl Into<PathBuf>, io_timeout: Duration) -> Result<Self, InfraError> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        if !tokio::fs::try_exists(&path).await? {
            tokio::fs::write(&path, b"[]\n").await?;
            info!(
                target = "catalog::store",
                path = %path.display(),
                "Created empty item document"
            );
        }

        Ok(Self { path, io_timeout })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn timeout_error(&self) -> RepoError {
        RepoError::Timeout {
            millis: self.io_timeout.as_millis(),
        }
    }
}

#[async_trait]
impl ItemsRepo for JsonFileStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load_items(&self) -> Result<Vec<Item>, RepoError> {
        let bytes = timeout(self.io_timeout, tokio::fs::read(&self.path))
            .await
            .map_err(|_| self.timeout_error())?
            .map_err(RepoError::from_persistence)?;

        let items: Vec<Item> = serde_json::from_slice(&bytes)
            .map_err(|err| RepoError::malformed(err.to_string()))?;
        debug!(count = items.len(), "Item document loaded");
        Ok(items)
    }

    #[instrument(skip(self, items), fields(path = %self.path.display(), count = items.len()))]
    async fn save_items(&self, items: &[Item]) -> Result<(), RepoError> {
        let mut bytes = serde_json::to_vec_pretty(items).map_err(RepoError::from_persistence)?;
        bytes.push(b'\n');

        let path = self.path.clone();
        let write = tokio::task::spawn_blocking(move || replace_document(&path, &bytes));

        timeout(self.io_timeout, write)
            .await
            .map_err(|_| self.timeout_error())?
            .map_err(RepoError::from_persistence)?
            .map_err(RepoError::from_persistence)?;

        debug!("Item document replaced");
        Ok(())
    }
}

/// Write `bytes` beside `path` and atomically rename over it.
fn replace_document(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = NamedTempFile::new_in(directory)?;
    staged.write_all(bytes)?;
    staged.as_file().sync_all()?;

    // Keep the document's permissions; the temp file is created owner-only.
    if let Ok(metadata) = std::fs::metadata(path) {
        let _ = staged.as_file().set_permissions(metadata.permissions());
    }

    staged.persist(path).map_err(|err| err.error)?;
    Ok(())
}
