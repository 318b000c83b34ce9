//! Blob stores for archived artifacts
//!
//! Paths are relative, `/`-separated and addressed verbatim; the archiver
//! never lists or scans a store.

mod fs;
mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use std::path::{Component, Path};

use crate::error::StorageError;

/// Result type for blob store operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Path-addressed blob store
///
/// Implementations must be safe for concurrent `put` calls to distinct paths.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` at `path`, replacing anything already there
    async fn put(&self, path: &str, data: &[u8]) -> StorageResult<()>;

    /// Read the blob at `path`
    async fn get(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Whether a blob exists at `path`
    async fn exists(&self, path: &str) -> StorageResult<bool>;

    /// Remove the blob at `path`
    ///
    /// Removing a missing blob succeeds. Removing a directory fails with
    /// [`StorageError::IsDirectory`].
    async fn delete(&self, path: &str) -> StorageResult<()>;

    /// Human-readable locator for `path`, used in logs
    fn uri(&self, path: &str) -> String;
}

/// Reject empty, absolute and parent-escaping paths
pub(crate) fn validate_path(path: &str) -> StorageResult<()> {
    let invalid = |reason: &str| StorageError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    if path.is_empty() {
        return Err(invalid("empty path"));
    }
    if path.starts_with('/') || path.starts_with('\\') {
        return Err(invalid("absolute path"));
    }

    for component in Path::new(path).components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => return Err(invalid("escapes the store root")),
            Component::RootDir | Component::Prefix(_) => return Err(invalid("absolute path")),
        }
    }

    Ok(())
}
