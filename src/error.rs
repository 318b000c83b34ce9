//! Error types for flickr-archive
//!
//! This module provides error handling for the library, including:
//! - The crate-wide [`Error`] type returned by client, crawl, storage and engine calls
//! - [`ArchiveError`], the per-item failure taxonomy (every variant names its item)
//! - [`StorageError`] for blob store operations
//! - Machine-readable error codes for reporting

use crate::types::ItemId;
use thiserror::Error;

/// Result type alias for flickr-archive operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for flickr-archive
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "api.api_key")
        key: Option<String>,
    },

    /// The remote service answered with a non-"ok" status
    #[error("remote service error {code}: {message}")]
    RemoteService {
        /// Numeric error code from the response payload
        code: i64,
        /// Error message from the response payload
        message: String,
    },

    /// A page fetch failed and the crawl was abandoned
    #[error("pagination aborted at page {page}: {source}")]
    PaginationAborted {
        /// The page whose fetch or decode failed
        page: u32,
        /// The underlying failure
        #[source]
        source: Box<Error>,
    },

    /// A single item failed to archive
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Blob store operation failed
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A response decoded as JSON but did not have the expected shape
    #[error("unexpected response: {0}")]
    Decode(String),

    /// The operation was cancelled before it started
    #[error("cancelled")]
    Cancelled,

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Per-item archival failures
///
/// Every variant carries the identifier of the item whose archival failed so
/// that aggregated outcomes can be reported without extra bookkeeping.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The info lookup failed or its response could not be decoded
    #[error("metadata unavailable for item {item}: {reason}")]
    MetadataUnavailable {
        /// The item being archived
        item: ItemId,
        /// Why the metadata could not be obtained
        reason: String,
    },

    /// Neither an original secret nor a standard secret was present
    #[error("no secret available for item {item}")]
    SecretMissing {
        /// The item being archived
        item: ItemId,
    },

    /// The size catalog lookup failed
    #[error("sizes unavailable for item {item}: {reason}")]
    SizesUnavailable {
        /// The item being archived
        item: ItemId,
        /// Why the size catalog could not be obtained
        reason: String,
    },

    /// None of the prioritised rendition labels were in the size catalog
    #[error("no usable rendition for item {item}")]
    NoRenditionAvailable {
        /// The item being archived
        item: ItemId,
    },

    /// The binary fetch failed
    #[error("download of {url} failed for item {item}: {reason}")]
    DownloadFailed {
        /// The item being archived
        item: ItemId,
        /// The rendition source locator
        url: String,
        /// Transport error or HTTP status
        reason: String,
    },

    /// A required placement into the blob store failed
    #[error("failed to write {path} for item {item}: {reason}")]
    StorageWriteFailed {
        /// The item being archived
        item: ItemId,
        /// The store path that could not be written
        path: String,
        /// The underlying storage failure
        reason: String,
    },

    /// The remote service rejected a call made on behalf of this item
    #[error("remote service error {code} for item {item}: {message}")]
    RemoteService {
        /// The item being archived
        item: ItemId,
        /// Numeric error code from the response payload
        code: i64,
        /// Error message from the response payload
        message: String,
    },
}

impl ArchiveError {
    /// The item this failure belongs to
    pub fn item(&self) -> ItemId {
        match self {
            ArchiveError::MetadataUnavailable { item, .. }
            | ArchiveError::SecretMissing { item }
            | ArchiveError::SizesUnavailable { item, .. }
            | ArchiveError::NoRenditionAvailable { item }
            | ArchiveError::DownloadFailed { item, .. }
            | ArchiveError::StorageWriteFailed { item, .. }
            | ArchiveError::RemoteService { item, .. } => *item,
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            ArchiveError::MetadataUnavailable { .. } => "metadata_unavailable",
            ArchiveError::SecretMissing { .. } => "secret_missing",
            ArchiveError::SizesUnavailable { .. } => "sizes_unavailable",
            ArchiveError::NoRenditionAvailable { .. } => "no_rendition_available",
            ArchiveError::DownloadFailed { .. } => "download_failed",
            ArchiveError::StorageWriteFailed { .. } => "storage_write_failed",
            ArchiveError::RemoteService { .. } => "remote_service_error",
        }
    }
}

/// Blob store errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Nothing stored at this path
    #[error("not found: {0}")]
    NotFound(String),

    /// The path names a directory, which the operation does not support
    #[error("{0} is a directory")]
    IsDirectory(String),

    /// The path is absolute, empty or escapes the store root
    #[error("invalid path {path}: {reason}")]
    InvalidPath {
        /// The rejected path
        path: String,
        /// Why it was rejected
        reason: String,
    },

    /// Underlying I/O failure
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The path being accessed
        path: String,
        /// The I/O error
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Machine-readable error code
    pub fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::RemoteService { .. } => "remote_service_error",
            Error::PaginationAborted { .. } => "pagination_aborted",
            Error::Archive(e) => e.code(),
            Error::Storage(e) => match e {
                StorageError::NotFound(_) => "not_found",
                StorageError::IsDirectory(_) => "is_directory",
                StorageError::InvalidPath { .. } => "invalid_path",
                StorageError::Io { .. } => "io_error",
            },
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::Io(_) => "io_error",
            Error::Decode(_) => "decode_error",
            Error::Cancelled => "cancelled",
            Error::Other(_) => "internal_error",
        }
    }

    /// Attach an item to a client or storage failure, classifying it for the given step.
    ///
    /// Remote service rejections keep their code and message; everything else
    /// becomes the step-specific variant built by `otherwise`.
    pub(crate) fn for_item(
        self,
        item: ItemId,
        otherwise: impl FnOnce(String) -> ArchiveError,
    ) -> ArchiveError {
        match self {
            Error::RemoteService { code, message } => ArchiveError::RemoteService {
                item,
                code,
                message,
            },
            Error::Archive(e) => e,
            other => otherwise(other.to_string()),
        }
    }
}
