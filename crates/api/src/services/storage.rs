//! Blob storage for ticket and message attachments.
//!
//! Keys are relative, forward-slash paths such as
//! `tickets/12/messages/40/<uuid>.pdf`.

use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Writes the whole object, replacing any previous one.
    async fn put(&self, key: &str, bytes: Bytes) -> io::Result<()>;

    /// Opens an object for streaming.
    async fn open(&self, key: &str) -> io::Result<tokio::fs::File>;

    /// Removes an object. A missing object is not an error.
    async fn delete(&self, key: &str) -> io::Result<()>;
}

/// Stores objects below a root directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FilesystemStore {
    root: PathBuf,
}

impl FilesystemStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> io::Result<PathBuf> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Invalid storage key: {}", key),
            ));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileStore for FilesystemStore {
    async fn put(&self, key: &str, bytes: Bytes) -> io::Result<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(&path).await?;
        file.write_all(&bytes).await?;
        file.flush().await
    }

    async fn open(&self, key: &str) -> io::Result<tokio::fs::File> {
        tokio::fs::File::open(self.resolve(key)?).await
    }

    async fn delete(&self, key: &str) -> io::Result<()> {
        match tokio::fs::remove_file(self.resolve(key)?).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// Best-effort removal after the rows are gone. Failures are logged only.
pub async fn remove_files(store: &Arc<dyn FileStore>, keys: &[String]) {
    for key in keys {
        if let Err(e) = store.delete(key).await {
            tracing::warn!(storage_key = %key, error = %e, "Failed to delete stored file");
        }
    }
}
