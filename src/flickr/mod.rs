//! Metadata service boundary
//!
//! Split into focused submodules:
//! - [`client`] - HTTP client for the Flickr REST endpoint
//! - [`response`] - Status checking and decoding of response documents
//! - [`user`] - Account lookup for user-scoped archival

pub mod client;
pub mod response;
pub mod user;

pub use client::FlickrClient;
pub use user::ArchiveUser;

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::error::Result;

/// Method names used by the archiver
pub mod methods {
    /// Photo search (paginated)
    pub const SEARCH: &str = "flickr.photos.search";
    /// A user's photo listing (paginated)
    pub const PEOPLE_GET_PHOTOS: &str = "flickr.people.getPhotos";
    /// Photo info document
    pub const GET_INFO: &str = "flickr.photos.getInfo";
    /// Photo size catalog
    pub const GET_SIZES: &str = "flickr.photos.getSizes";
    /// Photo EXIF data
    pub const GET_EXIF: &str = "flickr.photos.getExif";
    /// Photo comments
    pub const GET_COMMENTS: &str = "flickr.photos.comments.getList";
    /// Username to account id
    pub const FIND_BY_USERNAME: &str = "flickr.people.findByUsername";
    /// Account info (first upload date)
    pub const PEOPLE_GET_INFO: &str = "flickr.people.getInfo";
}

/// String-keyed multi-value parameter bag
///
/// Keys are kept sorted so that encoding and request signing are deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query {
    params: BTreeMap<String, Vec<String>>,
}

impl Query {
    /// Create an empty query
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every value of `key` with `value`
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.params.insert(key.into(), vec![value.into()]);
        self
    }

    /// Add a value to `key`, keeping existing ones
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.params.entry(key.into()).or_default().push(value.into());
        self
    }

    /// Builder-style [`Query::set`]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// First value of `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Remove `key` entirely
    pub fn remove(&mut self, key: &str) {
        self.params.remove(key);
    }

    /// Whether no parameters are set
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// All key/value pairs in key order, repeated keys in insertion order
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().flat_map(|(key, values)| {
            values
                .iter()
                .map(move |value| (key.as_str(), value.as_str()))
        })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Query {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut query = Query::new();
        for (key, value) in iter {
            query.append(key, value);
        }
        query
    }
}

/// The remote metadata/search service
///
/// Implementations return the raw response body of a successful call. A
/// response whose status is not "ok" must surface as
/// [`crate::Error::RemoteService`] carrying the remote code and message.
///
/// # Examples
///
/// ```no_run
/// use flickr_archive::flickr::{FlickrClient, MetadataService, Query, methods};
/// use flickr_archive::config::ApiConfig;
///
/// # async fn example() -> flickr_archive::Result<()> {
/// let client = FlickrClient::new(&ApiConfig {
///     api_key: "key".into(),
///     ..Default::default()
/// })?;
///
/// let body = client
///     .execute(methods::GET_INFO, &Query::new().with("photo_id", "31390876467"))
///     .await?;
/// println!("{} bytes", body.len());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait MetadataService: Send + Sync {
    /// Call `method` with `params` and return the response body
    async fn execute(&self, method: &str, params: &Query) -> Result<Vec<u8>>;
}
