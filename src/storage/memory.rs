//! In-memory blob store

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{BlobStore, StorageResult, validate_path};
use crate::error::StorageError;

/// Blob store kept in a sorted map, for tests and dry runs
///
/// A path is treated as a directory when other blobs live beneath it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored path, sorted
    pub async fn paths(&self) -> Vec<String> {
        self.blobs.read().await.keys().cloned().collect()
    }

    /// Number of stored blobs
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    /// Whether nothing is stored
    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }

    fn is_directory(blobs: &BTreeMap<String, Vec<u8>>, path: &str) -> bool {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        blobs
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(key, _)| key.starts_with(&prefix))
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn put(&self, path: &str, data: &[u8]) -> StorageResult<()> {
        validate_path(path)?;
        let mut blobs = self.blobs.write().await;
        if Self::is_directory(&blobs, path) {
            return Err(StorageError::IsDirectory(path.to_string()));
        }
        blobs.insert(path.to_string(), data.to_vec());
        Ok(())
    }

    async fn get(&self, path: &str) -> StorageResult<Vec<u8>> {
        validate_path(path)?;
        let blobs = self.blobs.read().await;
        match blobs.get(path) {
            Some(data) => Ok(data.clone()),
            None if Self::is_directory(&blobs, path) => {
                Err(StorageError::IsDirectory(path.to_string()))
            }
            None => Err(StorageError::NotFound(path.to_string())),
        }
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        validate_path(path)?;
        Ok(self.blobs.read().await.contains_key(path))
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        validate_path(path)?;
        let mut blobs = self.blobs.write().await;
        if blobs.remove(path).is_none() && Self::is_directory(&blobs, path) {
            return Err(StorageError::IsDirectory(path.to_string()));
        }
        Ok(())
    }

    fn uri(&self, path: &str) -> String {
        format!("memory:///{path}")
    }
}
