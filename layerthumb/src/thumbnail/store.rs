//! Byte storage for thumbnail images.
//!
//! [`ThumbnailStore`] is keyed by the storage keys produced in
//! [`naming`](super::naming). Writers publish atomically: a reader sees
//! either the previous image or the complete new one, never a truncated file.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::thumbnail::types::ThumbnailError;

/// Storage abstraction for thumbnail bytes.
pub trait ThumbnailStore: Send + Sync {
    /// Durably write `data` at `key`, replacing any previous content.
    fn put(&self, key: &str, data: Arc<Vec<u8>>) -> BoxFuture<'_, Result<(), ThumbnailError>>;

    /// Read the bytes at `key`. `Ok(None)` if nothing is stored there.
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, ThumbnailError>>;

    /// Check whether `key` holds data.
    fn exists(&self, key: &str) -> BoxFuture<'_, Result<bool, ThumbnailError>>;

    /// Last write time of `key`. `Ok(None)` if nothing is stored there.
    fn last_modified(&self, key: &str)
        -> BoxFuture<'_, Result<Option<DateTime<Utc>>, ThumbnailError>>;

    /// Delete `key`. Returns true if something was removed.
    fn remove(&self, key: &str) -> BoxFuture<'_, Result<bool, ThumbnailError>>;
}

/// Distinguishes temp files of concurrent writers within one process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Thumbnail store rooted at a cache directory.
///
/// Keys map to relative paths below the root (`foo/x1@2x.png` ->
/// `<root>/foo/x1@2x.png`); parent directories are created on demand.
#[derive(Debug, Clone)]
pub struct DiskThumbnailStore {
    root: PathBuf,
}

impl DiskThumbnailStore {
    /// Open a store, creating the root directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ThumbnailError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            ThumbnailError::StoreIo(format!("Failed to create {}: {}", root.display(), e))
        })?;
        Ok(Self { root })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to a path, refusing keys that would escape the root.
    pub fn key_path(&self, key: &str) -> Result<PathBuf, ThumbnailError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !safe {
            return Err(ThumbnailError::StoreIo(format!(
                "Invalid thumbnail key '{}'",
                key
            )));
        }
        Ok(self.root.join(relative))
    }

    async fn write_atomic(path: PathBuf, data: Arc<Vec<u8>>) -> Result<(), ThumbnailError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp_path = {
            let mut name = path.file_name().unwrap_or_default().to_os_string();
            name.push(format!(
                ".{}.{}.tmp",
                std::process::id(),
                TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
            ));
            path.with_file_name(name)
        };

        let written = async {
            let mut file = tokio::fs::File::create(&temp_path).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&temp_path, &path).await
        }
        .await;

        if let Err(e) = written {
            if let Err(cleanup) = tokio::fs::remove_file(&temp_path).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!(
                        path = %temp_path.display(),
                        error = %cleanup,
                        "Failed to remove temporary thumbnail file"
                    );
                }
            }
            return Err(ThumbnailError::StoreIo(format!(
                "Failed to write {}: {}",
                path.display(),
                e
            )));
        }

        debug!(path = %path.display(), bytes = data.len(), "Thumbnail written");
        Ok(())
    }
}

impl ThumbnailStore for DiskThumbnailStore {
    fn put(&self, key: &str, data: Arc<Vec<u8>>) -> BoxFuture<'_, Result<(), ThumbnailError>> {
        let path = self.key_path(key);
        Box::pin(async move { Self::write_atomic(path?, data).await })
    }

    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, ThumbnailError>> {
        let path = self.key_path(key);
        Box::pin(async move {
            let path = path?;
            match tokio::fs::read(&path).await {
                Ok(data) => Ok(Some(data)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(ThumbnailError::StoreIo(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                ))),
            }
        })
    }

    fn exists(&self, key: &str) -> BoxFuture<'_, Result<bool, ThumbnailError>> {
        let modified = self.last_modified(key);
        Box::pin(async move { Ok(modified.await?.is_some()) })
    }

    fn last_modified(
        &self,
        key: &str,
    ) -> BoxFuture<'_, Result<Option<DateTime<Utc>>, ThumbnailError>> {
        let path = self.key_path(key);
        Box::pin(async move {
            let path = path?;
            match tokio::fs::metadata(&path).await {
                Ok(metadata) if metadata.is_file() => Ok(Some(metadata.modified()?.into())),
                Ok(_) => Ok(None),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(ThumbnailError::StoreIo(format!(
                    "Failed to stat {}: {}",
                    path.display(),
                    e
                ))),
            }
        })
    }

    fn remove(&self, key: &str) -> BoxFuture<'_, Result<bool, ThumbnailError>> {
        let path = self.key_path(key);
        Box::pin(async move {
            match tokio::fs::remove_file(path?).await {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(ThumbnailError::StoreIo(e.to_string())),
            }
        })
    }
}

/// Thumbnail store held in memory.
///
/// Publishing swaps an `Arc` under a write lock, so readers always see a
/// complete image.
#[derive(Debug, Default)]
pub struct MemoryThumbnailStore {
    entries: RwLock<HashMap<String, (Arc<Vec<u8>>, DateTime<Utc>)>>,
}

impl MemoryThumbnailStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored images.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Override the recorded write time of a key.
    pub fn set_last_modified(&self, key: &str, at: DateTime<Utc>) -> bool {
        match self.entries.write().get_mut(key) {
            Some(entry) => {
                entry.1 = at;
                true
            }
            None => false,
        }
    }
}

impl ThumbnailStore for MemoryThumbnailStore {
    fn put(&self, key: &str, data: Arc<Vec<u8>>) -> BoxFuture<'_, Result<(), ThumbnailError>> {
        self.entries
            .write()
            .insert(key.to_string(), (data, Utc::now()));
        Box::pin(async { Ok(()) })
    }

    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, ThumbnailError>> {
        let data = self
            .entries
            .read()
            .get(key)
            .map(|(data, _)| data.as_ref().clone());
        Box::pin(async move { Ok(data) })
    }

    fn exists(&self, key: &str) -> BoxFuture<'_, Result<bool, ThumbnailError>> {
        let exists = self.entries.read().contains_key(key);
        Box::pin(async move { Ok(exists) })
    }

    fn last_modified(
        &self,
        key: &str,
    ) -> BoxFuture<'_, Result<Option<DateTime<Utc>>, ThumbnailError>> {
        let modified = self.entries.read().get(key).map(|(_, at)| *at);
        Box::pin(async move { Ok(modified) })
    }

    fn remove(&self, key: &str) -> BoxFuture<'_, Result<bool, ThumbnailError>> {
        let removed = self.entries.write().remove(key).is_some();
        Box::pin(async move { Ok(removed) })
    }
}
