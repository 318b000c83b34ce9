//! Account lookup for user-scoped archival

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use tracing::debug;

use super::response::Content;
use super::{MetadataService, Query, methods};
use crate::error::{Error, Result};
use crate::rate_limiter::RateLimiter;

/// An account whose uploads are archived day by day
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveUser {
    /// Username as given by the caller
    pub username: String,
    /// Account id (`user_id` parameter of listing methods)
    pub nsid: String,
    /// Date of the account's first upload, None if it has never uploaded
    pub first_upload: Option<NaiveDate>,
}

impl ArchiveUser {
    /// Resolve `username` to its account id and first upload date
    ///
    /// Issues two remote calls, each after a rate limiter permit.
    pub async fn lookup(
        service: &dyn MetadataService,
        limiter: &RateLimiter,
        username: &str,
    ) -> Result<Self> {
        limiter.acquire().await;
        let body = service
            .execute(
                methods::FIND_BY_USERNAME,
                &Query::new().with("username", username),
            )
            .await?;
        let nsid = decode_nsid(&body)?;

        limiter.acquire().await;
        let body = service
            .execute(
                methods::PEOPLE_GET_INFO,
                &Query::new().with("user_id", nsid.as_str()),
            )
            .await?;
        let first_upload = decode_first_upload(&body)?;

        debug!(username, nsid = %nsid, ?first_upload, "Resolved user");

        Ok(Self {
            username: username.to_string(),
            nsid,
            first_upload,
        })
    }
}

#[derive(Debug, Deserialize)]
struct FindEnvelope {
    user: FindUser,
}

#[derive(Debug, Deserialize)]
struct FindUser {
    #[serde(default)]
    nsid: Option<String>,
    #[serde(default)]
    id: Option<String>,
}

fn decode_nsid(body: &[u8]) -> Result<String> {
    let envelope: FindEnvelope = serde_json::from_slice(body)?;
    envelope
        .user
        .nsid
        .or(envelope.user.id)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::Decode("user lookup returned no account id".to_string()))
}

#[derive(Debug, Deserialize)]
struct PersonEnvelope {
    person: Person,
}

#[derive(Debug, Deserialize)]
struct Person {
    #[serde(default)]
    photos: Option<PersonPhotos>,
}

#[derive(Debug, Deserialize)]
struct PersonPhotos {
    #[serde(default)]
    firstdate: Option<Content>,
}

/// `person.photos.firstdate` is a unix timestamp, empty for accounts without uploads
fn decode_first_upload(body: &[u8]) -> Result<Option<NaiveDate>> {
    let envelope: PersonEnvelope = serde_json::from_slice(body)?;

    let Some(firstdate) = envelope.person.photos.and_then(|p| p.firstdate) else {
        return Ok(None);
    };
    let Some(timestamp) = firstdate.content.as_i64() else {
        return Ok(None);
    };

    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| Some(dt.date_naive()))
        .ok_or_else(|| Error::Decode(format!("invalid first upload timestamp {timestamp}")))
}
