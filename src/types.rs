//! Core types for flickr-archive

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ArchiveError;

/// Identifier of one archivable item (a photo or video)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub i64);

impl ItemId {
    /// Create a new ItemId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for ItemId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<ItemId> for i64 {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ItemId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// Coarse visibility class; only affects where an item is placed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Visible to everyone
    Public,
    /// Anything that is not fully public (friends, family, private)
    Private,
}

impl Visibility {
    /// Path segment used for this visibility
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One binary representation of an item
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendition {
    /// Size label, e.g. "Original" or "Large 2048"
    pub label: String,
    /// Where the binary can be fetched from
    pub source: String,
    /// Pixel width, when reported
    #[serde(default)]
    pub width: Option<u32>,
    /// Pixel height, when reported
    #[serde(default)]
    pub height: Option<u32>,
}

/// Metadata needed to archive one item, decoded from its info document
///
/// Produced fresh on every attempt and scoped to that attempt.
#[derive(Clone, Debug)]
pub struct ItemMetadata {
    /// Item identifier as reported by the service
    pub id: ItemId,
    /// Capability token used in artifact names (original secret preferred)
    pub secret: String,
    /// Visibility class
    pub visibility: Visibility,
    /// Calendar date the item was captured
    pub taken: NaiveDate,
    /// Owner username, when reported
    pub owner: Option<String>,
    /// The raw info document, archived verbatim
    pub raw: Vec<u8>,
}

/// One page of a paginated listing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchPage {
    /// Page number of this response (1-based)
    pub page: u32,
    /// Total number of pages reported by the service
    pub pages: u32,
    /// Item references in server order
    pub items: Vec<ItemId>,
}

/// A successfully archived item
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ArchivedItem {
    /// The archived item
    pub id: ItemId,
    /// Directory prefix shared by all of the item's artifacts
    pub directory: String,
    /// Label of the rendition that was stored
    pub rendition: String,
    /// Store paths written during this attempt
    pub artifacts: Vec<String>,
    /// Size of the stored binary in bytes (0 when reused)
    pub bytes: u64,
    /// The binary was already present and nothing was rewritten
    pub reused: bool,
}

/// Per-item result of one archival attempt
pub type ArchiveOutcome = std::result::Result<ArchivedItem, ArchiveError>;

/// Aggregated outcome of a batch or a search
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Items archived successfully
    pub archived: Vec<ArchivedItem>,
    /// Items that failed, one entry per item
    pub failures: Vec<ArchiveError>,
    /// Items never attempted because the batch was cancelled first
    pub skipped: Vec<ItemId>,
}

impl BatchReport {
    /// Record one item outcome
    pub fn record(&mut self, outcome: ArchiveOutcome) {
        match outcome {
            Ok(item) => self.archived.push(item),
            Err(e) => self.failures.push(e),
        }
    }

    /// Fold another report into this one
    pub fn merge(&mut self, other: BatchReport) {
        self.archived.extend(other.archived);
        self.failures.extend(other.failures);
        self.skipped.extend(other.skipped);
    }

    /// Whether any item failed
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Total number of items accounted for
    pub fn total(&self) -> usize {
        self.archived.len() + self.failures.len() + self.skipped.len()
    }
}

/// Progress events emitted by the archivist
///
/// Subscribe with [`crate::Archivist::subscribe`]. Events are best effort:
/// a lagging receiver loses old events rather than slowing archival down.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A listing page was fetched
    PageFetched {
        /// Page number
        page: u32,
        /// Total pages reported
        pages: u32,
        /// Items on this page
        items: usize,
    },
    /// An item was archived
    ItemArchived {
        /// The item
        id: ItemId,
        /// Directory its artifacts were placed under
        directory: String,
    },
    /// An item failed
    ItemFailed {
        /// The item
        id: ItemId,
        /// Rendered error
        error: String,
    },
    /// An item was skipped because its batch was cancelled
    ItemSkipped {
        /// The item
        id: ItemId,
    },
}
