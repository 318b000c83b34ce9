//! Deterministic placement of an item's artifacts
//!
//! Layout, relative to the blob store root:
//!
//! ```text
//! {username}/{visibility}/{YYYY}/{MM}/{DD}/{id}/{id}_{secret}_i.json   info
//!                                              {id}_{secret}_s.json   sizes
//!                                              {id}_{secret}_c.json   comments
//!                                              {id}_{secret}_e.json   EXIF
//!                                              {id}_r.json            request record
//!                                              {filename}             binary
//! ```
//!
//! The binary keeps the last path segment of its source URL.

use chrono::NaiveDate;
use url::Url;

use crate::types::{ItemId, ItemMetadata, Visibility};

/// Store paths for one item, recomputed on every attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoragePath {
    directory: String,
    id: ItemId,
    secret: String,
}

impl StoragePath {
    /// Plan paths from decoded metadata
    pub fn plan(username: &str, meta: &ItemMetadata) -> Self {
        Self::new(username, meta.id, &meta.secret, meta.taken, meta.visibility)
    }

    /// Plan paths from the individual components
    pub fn new(
        username: &str,
        id: ItemId,
        secret: &str,
        taken: NaiveDate,
        visibility: Visibility,
    ) -> Self {
        let directory = format!(
            "{}/{}/{}/{}",
            username,
            visibility.as_str(),
            taken.format("%Y/%m/%d"),
            id
        );
        Self {
            directory,
            id,
            secret: secret.to_string(),
        }
    }

    /// Directory shared by all artifacts, without trailing separator
    pub fn directory(&self) -> &str {
        &self.directory
    }

    /// Info document
    pub fn info(&self) -> String {
        self.document("i")
    }

    /// Size catalog document
    pub fn sizes(&self) -> String {
        self.document("s")
    }

    /// Comments document
    pub fn comments(&self) -> String {
        self.document("c")
    }

    /// EXIF document
    pub fn exif(&self) -> String {
        self.document("e")
    }

    /// Request record
    pub fn request(&self) -> String {
        format!("{}/{}_r.json", self.directory, self.id)
    }

    /// Binary path for a rendition source, None if the source has no usable filename
    pub fn binary(&self, source: &str) -> Option<String> {
        binary_filename(source).map(|name| format!("{}/{}", self.directory, name))
    }

    fn document(&self, suffix: &str) -> String {
        format!("{}/{}_{}_{}.json", self.directory, self.id, self.secret, suffix)
    }
}

/// Last non-empty path segment of a source URL
///
/// Any scheme is accepted. Segments that could escape the item directory
/// (`.` and `..`) are rejected.
pub fn binary_filename(source: &str) -> Option<String> {
    let url = Url::parse(source).ok()?;
    let name = url.path_segments()?.next_back()?;

    match name {
        "" | "." | ".." => None,
        name => Some(name.to_string()),
    }
}
