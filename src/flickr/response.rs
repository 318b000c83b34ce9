//! Decoding of Flickr response documents
//!
//! The service is loose about numeric types (ids and page counts arrive as
//! either strings or numbers), so the decoders here accept both.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{ArchiveError, Error, Result};
use crate::types::{ItemId, ItemMetadata, Rendition, SearchPage, Visibility};

/// A value the service sends either as a JSON number or as a string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Loose {
    Int(i64),
    Bool(bool),
    Str(String),
}

impl Loose {
    pub(crate) fn as_i64(&self) -> Option<i64> {
        match self {
            Loose::Int(n) => Some(*n),
            Loose::Bool(b) => Some(i64::from(*b)),
            Loose::Str(s) => s.trim().parse().ok(),
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            Loose::Bool(b) => Some(*b),
            other => other.as_i64().map(|n| n != 0),
        }
    }
}

/// `{"_content": "..."}` wrapper used throughout the API
#[derive(Debug, Deserialize)]
pub(crate) struct Content {
    #[serde(rename = "_content")]
    pub(crate) content: Loose,
}

#[derive(Debug, Deserialize)]
struct StatusEnvelope {
    stat: Option<String>,
    code: Option<i64>,
    message: Option<String>,
}

/// Check the `stat` field of a response body
///
/// `{"stat":"fail","code":96,"message":"Invalid signature"}` becomes
/// [`Error::RemoteService`] with code 96.
pub fn check_status(body: &[u8]) -> Result<()> {
    let envelope: StatusEnvelope = serde_json::from_slice(body)?;

    match envelope.stat.as_deref() {
        None => Err(Error::Decode("unable to determine response status".to_string())),
        Some("ok") => Ok(()),
        Some(_) => match (envelope.code, envelope.message) {
            (Some(code), Some(message)) => Err(Error::RemoteService { code, message }),
            _ => Err(Error::Decode("unable to parse error response".to_string())),
        },
    }
}

#[derive(Debug, Deserialize)]
struct InfoEnvelope {
    photo: InfoPhoto,
}

#[derive(Debug, Deserialize)]
struct InfoPhoto {
    id: Loose,
    #[serde(default)]
    secret: Option<String>,
    #[serde(default)]
    originalsecret: Option<String>,
    #[serde(default)]
    owner: Option<InfoOwner>,
    #[serde(default)]
    dates: Option<InfoDates>,
    #[serde(default)]
    visibility: Option<InfoVisibility>,
}

#[derive(Debug, Deserialize)]
struct InfoOwner {
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfoDates {
    #[serde(default)]
    taken: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfoVisibility {
    ispublic: Loose,
}

/// Decode a `flickr.photos.getInfo` body into [`ItemMetadata`]
///
/// The original secret is preferred over the standard secret. The body is
/// kept verbatim in [`ItemMetadata::raw`].
pub fn decode_info(item: ItemId, body: Vec<u8>) -> std::result::Result<ItemMetadata, ArchiveError> {
    let unavailable = |reason: String| ArchiveError::MetadataUnavailable { item, reason };

    let envelope: InfoEnvelope =
        serde_json::from_slice(&body).map_err(|e| unavailable(e.to_string()))?;
    let photo = envelope.photo;

    let id = photo
        .id
        .as_i64()
        .map(ItemId)
        .ok_or_else(|| unavailable("unable to determine photo id".to_string()))?;
    if id != item {
        return Err(unavailable(format!("mismatched photo id {id}")));
    }

    let secret = photo
        .originalsecret
        .filter(|s| !s.is_empty())
        .or(photo.secret.filter(|s| !s.is_empty()))
        .ok_or(ArchiveError::SecretMissing { item })?;

    let taken = photo
        .dates
        .and_then(|d| d.taken)
        .ok_or_else(|| unavailable("unable to determine date taken".to_string()))?;
    let taken = parse_taken(&taken).ok_or_else(|| unavailable(format!("invalid date taken {taken:?}")))?;

    let visibility = match photo.visibility.and_then(|v| v.ispublic.as_bool()) {
        Some(true) => Visibility::Public,
        Some(false) => Visibility::Private,
        None => return Err(unavailable("unable to determine visibility".to_string())),
    };

    Ok(ItemMetadata {
        id,
        secret,
        visibility,
        taken,
        owner: photo.owner.and_then(|o| o.username).filter(|u| !u.is_empty()),
        raw: body,
    })
}

/// Calendar date of a `dates.taken` value such as `2018-11-26 10:22:01`
fn parse_taken(taken: &str) -> Option<NaiveDate> {
    let ymd = taken.split_whitespace().next()?;
    NaiveDate::parse_from_str(ymd, "%Y-%m-%d").ok()
}

#[derive(Debug, Deserialize)]
struct SizesEnvelope {
    sizes: SizesList,
}

#[derive(Debug, Deserialize)]
struct SizesList {
    #[serde(default)]
    size: Vec<SizeEntry>,
}

#[derive(Debug, Deserialize)]
struct SizeEntry {
    label: String,
    source: String,
    #[serde(default)]
    width: Option<Loose>,
    #[serde(default)]
    height: Option<Loose>,
}

/// Decode a `flickr.photos.getSizes` body into the rendition catalog, in server order
pub fn decode_sizes(body: &[u8]) -> Result<Vec<Rendition>> {
    let envelope: SizesEnvelope = serde_json::from_slice(body)?;

    Ok(envelope
        .sizes
        .size
        .into_iter()
        .map(|entry| Rendition {
            label: entry.label,
            source: entry.source,
            width: dimension(entry.width),
            height: dimension(entry.height),
        })
        .collect())
}

fn dimension(value: Option<Loose>) -> Option<u32> {
    value
        .and_then(|v| v.as_i64())
        .and_then(|n| u32::try_from(n).ok())
}

#[derive(Debug, Deserialize)]
struct PageEnvelope {
    #[serde(alias = "photoset")]
    photos: PageBody,
}

#[derive(Debug, Deserialize)]
struct PageBody {
    page: Loose,
    pages: Loose,
    #[serde(default)]
    photo: Vec<PageEntry>,
}

#[derive(Debug, Deserialize)]
struct PageEntry {
    id: Loose,
}

/// Decode a standard photo listing (search, people.getPhotos, photosets.getPhotos)
pub fn decode_search_page(body: &[u8]) -> Result<SearchPage> {
    let envelope: PageEnvelope = serde_json::from_slice(body)?;
    let body = envelope.photos;

    let page = page_number(&body.page, "page")?;
    let pages = page_number(&body.pages, "pages")?;

    let items = body
        .photo
        .iter()
        .map(|entry| {
            entry
                .id
                .as_i64()
                .map(ItemId)
                .ok_or_else(|| Error::Decode(format!("invalid photo id {:?}", entry.id)))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(SearchPage { page, pages, items })
}

fn page_number(value: &Loose, field: &str) -> Result<u32> {
    value
        .as_i64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| Error::Decode(format!("invalid {field} value {value:?}")))
}
