//! Filesystem blob store

use async_trait::async_trait;
use rand::Rng;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{BlobStore, StorageResult, validate_path};
use crate::error::StorageError;

/// Blob store rooted at a local directory
///
/// Writes go to a temporary sibling file that is renamed into place, so a
/// reader never observes a partially written blob.
#[derive(Clone, Debug)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Create a store rooted at `root` (created lazily on first write)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store root directory
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> StorageResult<PathBuf> {
        validate_path(path)?;
        Ok(self.root.join(path))
    }
}

fn io_error(path: &str, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.to_string(),
        source,
    }
}

#[async_trait]
impl BlobStore for FsStore {
    async fn put(&self, path: &str, data: &[u8]) -> StorageResult<()> {
        let target = self.resolve(path)?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(path, e))?;
        }

        let file_name = target
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("blob");
        let suffix: u64 = rand::thread_rng().r#gen();
        let temp = target.with_file_name(format!(".{file_name}.{suffix:016x}.tmp"));

        let written: std::io::Result<()> = async {
            let mut file = fs::File::create(&temp).await?;
            file.write_all(data).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&temp, &target).await
        }
        .await;

        if let Err(e) = written {
            let _ = fs::remove_file(&temp).await;
            if fs::metadata(&target).await.map(|m| m.is_dir()).unwrap_or(false) {
                return Err(StorageError::IsDirectory(path.to_string()));
            }
            return Err(io_error(path, e));
        }

        Ok(())
    }

    async fn get(&self, path: &str) -> StorageResult<Vec<u8>> {
        let target = self.resolve(path)?;

        match fs::metadata(&target).await {
            Ok(meta) if meta.is_dir() => return Err(StorageError::IsDirectory(path.to_string())),
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(path.to_string()));
            }
            Err(e) => return Err(io_error(path, e)),
        }

        fs::read(&target).await.map_err(|e| io_error(path, e))
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let target = self.resolve(path)?;

        match fs::metadata(&target).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(path, e)),
        }
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        let target = self.resolve(path)?;

        match fs::metadata(&target).await {
            Ok(meta) if meta.is_dir() => Err(StorageError::IsDirectory(path.to_string())),
            Ok(_) => fs::remove_file(&target)
                .await
                .map_err(|e| io_error(path, e)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(path, e)),
        }
    }

    fn uri(&self, path: &str) -> String {
        format!("file://{}", self.root.join(path).display())
    }
}
