//! Archival of a single item
//!
//! Steps, strictly in order:
//! 1. Fetch and decode the info document (secret, visibility, capture date)
//! 2. Fetch and decode the size catalog
//! 3. Resolve the best rendition
//! 4. Download the binary (and any enabled extras)
//! 5. Place every artifact under the item's storage path
//!
//! Nothing is written before step 5, and a failed placement does not roll
//! back earlier ones: rerunning the item overwrites them in place.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{ArchiveOptions, RetryConfig};
use crate::error::{ArchiveError, Error, Result};
use crate::flickr::response::{decode_info, decode_sizes};
use crate::flickr::{MetadataService, Query, methods};
use crate::path::StoragePath;
use crate::rate_limiter::RateLimiter;
use crate::rendition::RenditionResolver;
use crate::retry::with_retry;
use crate::storage::BlobStore;
use crate::types::{ArchiveOutcome, ArchivedItem, ItemId, ItemMetadata, Rendition};

/// Record stored as `{id}_r.json` when request archiving is enabled
#[derive(Debug, Serialize)]
struct RequestRecord<'a> {
    id: ItemId,
    rendition: &'a str,
    source: &'a str,
    archived_at: DateTime<Utc>,
}

/// Archives one item at a time; cheap to clone into each task
#[derive(Clone)]
pub struct ItemArchiver {
    pub(crate) service: Arc<dyn MetadataService>,
    pub(crate) store: Arc<dyn BlobStore>,
    pub(crate) http: reqwest::Client,
    pub(crate) api_limiter: RateLimiter,
    pub(crate) download_limiter: RateLimiter,
    pub(crate) resolver: Arc<RenditionResolver>,
    pub(crate) options: Arc<ArchiveOptions>,
    pub(crate) retry: Arc<RetryConfig>,
    pub(crate) username: Option<String>,
}

impl ItemArchiver {
    /// Same archiver, placing items under `username`
    #[must_use]
    pub fn for_user(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Archive one item
    ///
    /// Every failure names `id` and identifies the step that failed.
    pub async fn archive(&self, id: ItemId) -> ArchiveOutcome {
        debug!(item_id = %id, "Archiving item");

        let meta = self.fetch_info(id).await?;

        let sizes_body = self
            .call(methods::GET_SIZES, id)
            .await
            .map_err(|e| e.for_item(id, |reason| ArchiveError::SizesUnavailable { item: id, reason }))?;
        let catalog = decode_sizes(&sizes_body).map_err(|e| {
            e.for_item(id, |reason| ArchiveError::SizesUnavailable { item: id, reason })
        })?;

        let rendition = self
            .resolver
            .resolve(&catalog)
            .cloned()
            .ok_or(ArchiveError::NoRenditionAvailable { item: id })?;

        let username = self
            .username
            .clone()
            .or_else(|| meta.owner.clone())
            .ok_or_else(|| ArchiveError::MetadataUnavailable {
                item: id,
                reason: "unable to determine owner username".to_string(),
            })?;
        let path = StoragePath::plan(&username, &meta);
        let binary_path =
            path.binary(&rendition.source)
                .ok_or_else(|| ArchiveError::DownloadFailed {
                    item: id,
                    url: rendition.source.clone(),
                    reason: "source has no usable filename".to_string(),
                })?;

        if self.options.skip_existing && matches!(self.store.exists(&binary_path).await, Ok(true)) {
            info!(item_id = %id, path = %binary_path, "Binary already archived, skipping");
            return Ok(ArchivedItem {
                id,
                directory: path.directory().to_string(),
                rendition: rendition.label,
                artifacts: Vec::new(),
                bytes: 0,
                reused: true,
            });
        }

        let binary = self.download(id, &rendition.source).await?;
        let comments = if self.options.comments {
            Some(self.fetch_extra(methods::GET_COMMENTS, "comments", id).await?)
        } else {
            None
        };
        let exif = if self.options.exif {
            Some(self.fetch_extra(methods::GET_EXIF, "EXIF", id).await?)
        } else {
            None
        };

        let mut artifacts = Vec::new();
        self.place(id, binary_path, &binary, &mut artifacts).await?;
        if self.options.info {
            self.place(id, path.info(), &meta.raw, &mut artifacts).await?;
        }
        if self.options.sizes {
            self.place(id, path.sizes(), &sizes_body, &mut artifacts).await?;
        }
        if let Some(body) = comments {
            self.place(id, path.comments(), &body, &mut artifacts).await?;
        }
        if let Some(body) = exif {
            self.place(id, path.exif(), &body, &mut artifacts).await?;
        }
        if self.options.request {
            let record = request_record(&meta, &rendition).map_err(|e| {
                e.for_item(id, |reason| ArchiveError::StorageWriteFailed {
                    item: id,
                    path: path.request(),
                    reason,
                })
            })?;
            self.place(id, path.request(), &record, &mut artifacts).await?;
        }

        info!(
            item_id = %id,
            rendition = %rendition.label,
            bytes = binary.len(),
            directory = %path.directory(),
            "Item archived"
        );

        Ok(ArchivedItem {
            id,
            directory: path.directory().to_string(),
            rendition: rendition.label,
            artifacts,
            bytes: binary.len() as u64,
            reused: false,
        })
    }

    async fn fetch_info(&self, id: ItemId) -> std::result::Result<ItemMetadata, ArchiveError> {
        let body = self.call(methods::GET_INFO, id).await.map_err(|e| {
            e.for_item(id, |reason| ArchiveError::MetadataUnavailable { item: id, reason })
        })?;
        decode_info(id, body)
    }

    async fn fetch_extra(
        &self,
        method: &str,
        what: &str,
        id: ItemId,
    ) -> std::result::Result<Vec<u8>, ArchiveError> {
        self.call(method, id).await.map_err(|e| {
            e.for_item(id, |reason| ArchiveError::MetadataUnavailable {
                item: id,
                reason: format!("{what}: {reason}"),
            })
        })
    }

    /// One remote call for `id`, retried on transient failures
    async fn call(&self, method: &str, id: ItemId) -> Result<Vec<u8>> {
        let params = Query::new().with("photo_id", id.to_string());
        let params = &params;

        with_retry(&self.retry, || async move {
            self.api_limiter.acquire().await;
            self.service.execute(method, params).await
        })
        .await
    }

    async fn download(&self, id: ItemId, url: &str) -> std::result::Result<Vec<u8>, ArchiveError> {
        with_retry(&self.retry, || async move {
            self.download_limiter.acquire().await;
            let response = self.http.get(url).send().await?.error_for_status()?;
            Ok::<_, Error>(response.bytes().await?.to_vec())
        })
        .await
        .map_err(|e| ArchiveError::DownloadFailed {
            item: id,
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    async fn place(
        &self,
        id: ItemId,
        path: String,
        data: &[u8],
        artifacts: &mut Vec<String>,
    ) -> std::result::Result<(), ArchiveError> {
        self.store
            .put(&path, data)
            .await
            .map_err(|e| ArchiveError::StorageWriteFailed {
                item: id,
                path: path.clone(),
                reason: e.to_string(),
            })?;
        debug!(item_id = %id, uri = %self.store.uri(&path), "Placed artifact");
        artifacts.push(path);
        Ok(())
    }
}

fn request_record(meta: &ItemMetadata, rendition: &Rendition) -> Result<Vec<u8>> {
    let record = RequestRecord {
        id: meta.id,
        rendition: &rendition.label,
        source: &rendition.source,
        archived_at: Utc::now(),
    };
    Ok(serde_json::to_vec_pretty(&record)?)
}
