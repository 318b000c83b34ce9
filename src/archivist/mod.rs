//! Archival engine split into focused submodules.
//!
//! The `Archivist` struct and its methods are organized by domain:
//! - [`item`] - Single-item archival (metadata, rendition, download, placement)
//! - [`batch`] - Bounded-concurrency fan-out with failure policy
//! - [`search`] - Paginated listings, day-bounded searches and user archives

mod batch;
mod item;
mod search;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use item::ItemArchiver;

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::Result;
use crate::flickr::client::build_http_client;
use crate::flickr::{FlickrClient, MetadataService};
use crate::rate_limiter::RateLimiter;
use crate::rendition::RenditionResolver;
use crate::storage::BlobStore;
use crate::types::Event;

/// Main archivist instance (cloneable - all fields are Arc-wrapped)
///
/// The metadata service and the blob store are injected; rate limiters are
/// owned per archivist and shared by every batch it runs.
#[derive(Clone)]
pub struct Archivist {
    /// Remote metadata/search service
    pub(crate) service: Arc<dyn MetadataService>,
    /// Destination for archived artifacts
    pub(crate) store: Arc<dyn BlobStore>,
    /// HTTP client for binary downloads
    pub(crate) http: reqwest::Client,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Permits for API calls
    pub(crate) api_limiter: RateLimiter,
    /// Permits for binary downloads (shares state with `api_limiter` unless configured)
    pub(crate) download_limiter: RateLimiter,
    /// Rendition priority
    pub(crate) resolver: Arc<RenditionResolver>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Parent of every batch token; cancelling it stops all batches
    pub(crate) shutdown: CancellationToken,
}

impl Archivist {
    /// Create an archivist over an arbitrary metadata service and store
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or the HTTP client cannot be created
    pub fn new(
        config: Config,
        service: Arc<dyn MetadataService>,
        store: Arc<dyn BlobStore>,
    ) -> Result<Self> {
        config.validate()?;

        let http = build_http_client(&config.api)?;
        let api_limiter = RateLimiter::new(config.throttle.requests_per_second);
        let download_limiter = match config.throttle.download_requests_per_second {
            Some(rate) => RateLimiter::new(rate),
            None => api_limiter.clone(),
        };
        let resolver = Arc::new(RenditionResolver::new(
            config.archive.rendition_priority.clone(),
        ));

        // Buffer of 1000 events; lagging subscribers drop old events
        let (event_tx, _rx) = broadcast::channel(1000);

        Ok(Self {
            service,
            store,
            http,
            config: Arc::new(config),
            api_limiter,
            download_limiter,
            resolver,
            event_tx,
            shutdown: CancellationToken::new(),
        })
    }

    /// Create an archivist talking to the Flickr REST API
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or the HTTP client cannot be created
    pub fn flickr(config: Config, store: Arc<dyn BlobStore>) -> Result<Self> {
        config.validate()?;
        let http = build_http_client(&config.api)?;
        let client = FlickrClient::with_http(&config.api, http);
        Self::new(config, Arc::new(client), store)
    }

    /// Subscribe to progress events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Cancel every running and future batch of this archivist
    ///
    /// Items already past their start check run to completion.
    pub fn cancel(&self) {
        tracing::info!("Archivist cancelled");
        self.shutdown.cancel();
    }

    /// Whether [`Archivist::cancel`] has been called
    pub fn is_cancelled(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Limiter gating API calls (adjustable at runtime with [`RateLimiter::set_rate`])
    pub fn api_limiter(&self) -> &RateLimiter {
        &self.api_limiter
    }

    /// Single-item archiver sharing this archivist's service, store and limiters
    pub fn item_archiver(&self) -> ItemArchiver {
        ItemArchiver {
            service: self.service.clone(),
            store: self.store.clone(),
            http: self.http.clone(),
            api_limiter: self.api_limiter.clone(),
            download_limiter: self.download_limiter.clone(),
            resolver: self.resolver.clone(),
            options: Arc::new(self.config.archive.clone()),
            retry: Arc::new(self.config.retry.clone()),
            username: self.config.username.clone(),
        }
    }

    pub(crate) fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
