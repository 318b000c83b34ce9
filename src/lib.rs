//! # flickr-archive
//!
//! Bulk archiver for Flickr photo collections.
//!
//! Walks a paginated search listing, resolves every item's best rendition and
//! metadata, and places both in a blob store under a deterministic path,
//! within a fixed request rate and concurrency budget.
//!
//! ## Design Philosophy
//!
//! - **Deterministic layout** - The same item always lands at the same path,
//!   so rerunning an archive simply overwrites it
//! - **Bounded** - One rate limiter and one concurrency budget per archivist
//! - **Pluggable** - Metadata service and blob store are trait objects
//! - **Event-driven** - Consumers subscribe to progress events
//!
//! ## Quick Start
//!
//! ```no_run
//! use flickr_archive::{Archivist, Config, FsStore, Query};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.api.api_key = "your-api-key".to_string();
//!     config.username = Some("straup".to_string());
//!
//!     let archivist = Archivist::flickr(config, Arc::new(FsStore::new("archive")))?;
//!
//!     // Subscribe to events
//!     let mut events = archivist.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let query = Query::new().with("user_id", "35034348999@N01");
//!     let report = archivist.archive_search(&query).await?;
//!     println!("{} archived, {} failed", report.archived.len(), report.failures.len());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Archival engine (decomposed into focused submodules)
pub mod archivist;
/// Configuration types
pub mod config;
/// Paginated listing crawl
pub mod crawl;
/// Error types
pub mod error;
/// Flickr metadata service
pub mod flickr;
/// Storage path planning
pub mod path;
/// Request rate limiting
pub mod rate_limiter;
/// Rendition selection
pub mod rendition;
/// Retry logic with exponential backoff
pub mod retry;
/// Blob stores
pub mod storage;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use archivist::{Archivist, ItemArchiver};
pub use config::{ArchiveOptions, Config, FailurePolicy};
pub use error::{ArchiveError, Error, Result, StorageError};
pub use flickr::{ArchiveUser, FlickrClient, MetadataService, Query};
pub use rate_limiter::RateLimiter;
pub use storage::{BlobStore, FsStore, MemoryStore};
pub use types::{ArchivedItem, BatchReport, Event, ItemId, Visibility};

/// Cancel `archivist` when a termination signal arrives.
///
/// - **Unix:** listens for SIGTERM and SIGINT.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// Running items finish; queued items and further pages are skipped.
///
/// # Example
///
/// ```no_run
/// use flickr_archive::{Archivist, Config, MemoryStore, cancel_on_signal};
/// use std::sync::Arc;
///
/// # async fn example() -> flickr_archive::Result<()> {
/// let archivist = Archivist::flickr(Config::default(), Arc::new(MemoryStore::new()))?;
/// tokio::spawn(cancel_on_signal(archivist.clone()));
/// # Ok(())
/// # }
/// ```
pub async fn cancel_on_signal(archivist: Archivist) {
    wait_for_signal().await;
    archivist.cancel();
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Received Ctrl+C signal");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
