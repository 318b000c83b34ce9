//! Configuration types for flickr-archive

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default Flickr REST endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.flickr.com/services/rest/";

/// Rendition labels tried in order, highest quality first
pub const DEFAULT_RENDITION_PRIORITY: &[&str] = &[
    "Original",
    "Large 2048",
    "Large 1600",
    "Large",
    "Medium 800",
    "Medium 640",
    "Medium",
];

/// Remote API settings (endpoint, credentials, transport)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// REST endpoint (default: the public Flickr endpoint)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// API key sent with every call
    #[serde(default)]
    pub api_key: String,

    /// API secret, used only when request signing is enabled
    #[serde(default)]
    pub api_secret: Option<String>,

    /// Add an `api_sig` parameter to every call (default: false)
    #[serde(default)]
    pub sign_requests: bool,

    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// User-Agent header for API calls and binary downloads
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: String::new(),
            api_secret: None,
            sign_requests: false,
            timeout: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Which artifacts to place for each item
///
/// The binary is always stored; every other artifact is independently toggled.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArchiveOptions {
    /// Store the info document as `{id}_{secret}_i.json` (default: true)
    #[serde(default = "default_true")]
    pub info: bool,

    /// Store the size catalog as `{id}_{secret}_s.json` (default: false)
    #[serde(default)]
    pub sizes: bool,

    /// Fetch and store EXIF data as `{id}_{secret}_e.json` (default: false)
    #[serde(default)]
    pub exif: bool,

    /// Fetch and store comments as `{id}_{secret}_c.json` (default: false)
    #[serde(default)]
    pub comments: bool,

    /// Store the archival request record as `{id}_r.json` (default: false)
    #[serde(default)]
    pub request: bool,

    /// Skip download and placement when the binary already exists (default: false)
    #[serde(default)]
    pub skip_existing: bool,

    /// Rendition labels in priority order, highest quality first
    #[serde(default = "default_rendition_priority")]
    pub rendition_priority: Vec<String>,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            info: true,
            sizes: false,
            exif: false,
            comments: false,
            request: false,
            skip_existing: false,
            rendition_priority: default_rendition_priority(),
        }
    }
}

/// Request rate and concurrency budget
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Permits per second for API calls (default: 10, 0 = unlimited)
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Separate permit rate for binary downloads (None = share the API budget)
    #[serde(default)]
    pub download_requests_per_second: Option<u32>,

    /// Maximum items archived concurrently within a batch (default: 16)
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
            download_requests_per_second: None,
            max_in_flight: default_max_in_flight(),
        }
    }
}

/// Retry behavior for transient per-item failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// How a batch reacts to item failures
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Return the first failure immediately and stop starting new items (default)
    #[default]
    FailFast,
    /// Let every item finish and report all failures together
    CollectAll,
}

/// Top-level configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Artifact toggles and rendition priority
    #[serde(default)]
    pub archive: ArchiveOptions,

    /// Rate and concurrency budget
    #[serde(default)]
    pub throttle: ThrottleConfig,

    /// Retry behavior
    #[serde(default)]
    pub retry: RetryConfig,

    /// Batch failure policy
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// First path segment for every item; falls back to the owner reported
    /// in the item's info document
    #[serde(default)]
    pub username: Option<String>,
}

impl Config {
    /// Load a configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let body = std::fs::read(path)?;
        let config: Config = serde_json::from_slice(&body).map_err(|e| Error::Config {
            message: format!("{}: {}", path.display(), e),
            key: None,
        })?;
        Ok(config)
    }

    /// Check settings that cannot be expressed in the type system
    pub fn validate(&self) -> Result<()> {
        if self.throttle.max_in_flight == 0 {
            return Err(Error::Config {
                message: "max_in_flight must be at least 1".to_string(),
                key: Some("throttle.max_in_flight".to_string()),
            });
        }
        if self.archive.rendition_priority.is_empty() {
            return Err(Error::Config {
                message: "rendition priority list is empty".to_string(),
                key: Some("archive.rendition_priority".to_string()),
            });
        }
        if self.api.sign_requests && self.api.api_secret.as_deref().unwrap_or("").is_empty() {
            return Err(Error::Config {
                message: "request signing requires an API secret".to_string(),
                key: Some("api.api_secret".to_string()),
            });
        }
        if url::Url::parse(&self.api.endpoint).is_err() {
            return Err(Error::Config {
                message: format!("invalid endpoint URL: {}", self.api.endpoint),
                key: Some("api.endpoint".to_string()),
            });
        }
        match &self.username {
            Some(username) if username.is_empty() || username.contains('/') => {
                Err(Error::Config {
                    message: format!("username {username:?} cannot be used as a path segment"),
                    key: Some("username".to_string()),
                })
            }
            _ => Ok(()),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    format!("flickr-archive/{}", env!("CARGO_PKG_VERSION"))
}

fn default_true() -> bool {
    true
}

fn default_rendition_priority() -> Vec<String> {
    DEFAULT_RENDITION_PRIORITY
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_requests_per_second() -> u32 {
    10
}

fn default_max_in_flight() -> usize {
    16
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
