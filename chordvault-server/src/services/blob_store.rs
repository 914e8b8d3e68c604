//! Object storage boundary for the shared remote tier
//!
//! [`BlobStore`] is the only surface the remote tier client sees; the
//! filesystem implementation stores one file per key under a root
//! directory.

use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;

/// Blob store errors
#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

pub type BlobResult<T> = std::result::Result<T, BlobStoreError>;

/// Minimal key/value object store
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Object bytes, or `None` if the key does not exist
    async fn get(&self, key: &str) -> BlobResult<Option<Vec<u8>>>;

    /// Create or replace an object
    async fn put(&self, key: &str, data: Vec<u8>) -> BlobResult<()>;

    fn backend_name(&self) -> &'static str;
}

/// Filesystem-backed [`BlobStore`]
pub struct FilesystemBlobStore {
    root: PathBuf,
    temp_counter: AtomicU64,
}

impl FilesystemBlobStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub async fn new(root: impl AsRef<Path>) -> BlobResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            temp_counter: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path for `key`, rejecting anything that could leave the root
    fn key_path(&self, key: &str) -> BlobResult<PathBuf> {
        if key.is_empty() || key.starts_with('/') || key.starts_with('\\') || key.contains("..") {
            return Err(BlobStoreError::InvalidKey(format!(
                "path traversal not allowed: {key}"
            )));
        }

        for component in Path::new(key).components() {
            if !matches!(component, Component::Normal(_)) {
                return Err(BlobStoreError::InvalidKey(format!(
                    "contains unsafe path component: {key}"
                )));
            }
        }

        Ok(self.root.join(key))
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn get(&self, key: &str) -> BlobResult<Option<Vec<u8>>> {
        let path = self.key_path(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BlobStoreError::Io(e)),
        }
    }

    #[instrument(skip(self, data), fields(backend = "filesystem", size = data.len()))]
    async fn put(&self, key: &str, data: Vec<u8>) -> BlobResult<()> {
        let path = self.key_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Unique temp name per write; rename makes the replace atomic
        let seq = self.temp_counter.fetch_add(1, Ordering::Relaxed);
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp_path = path.with_file_name(format!(".{}.{}.{}.tmp", file_name, std::process::id(), seq));

        {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
        }
        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(BlobStoreError::Io(e));
        }

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}
