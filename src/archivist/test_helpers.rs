//! Shared test helpers for exercising the Archivist without a live service.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::archivist::Archivist;
use crate::config::{Config, RetryConfig};
use crate::error::{Error, Result};
use crate::flickr::response::check_status;
use crate::flickr::{MetadataService, Query, methods};
use crate::storage::MemoryStore;

/// Body served for every binary
pub(crate) const IMAGE_BYTES: &[u8] = b"\xFF\xD8\xFFfake-jpeg";

/// Scripted reply for one (method, key) pair
#[derive(Clone, Debug)]
pub(crate) enum Reply {
    /// Response body, run through the normal status check
    Body(String),
    /// Connection reset (transient)
    Transport,
}

/// MetadataService that answers from a table keyed by method and
/// `photo_id` (or `page` for listings) and records every call
#[derive(Default)]
pub(crate) struct MockService {
    replies: Mutex<HashMap<(String, String), Reply>>,
    transient_failures: Mutex<HashMap<(String, String), u32>>,
    calls: Mutex<Vec<(String, Query)>>,
    delay: Option<Duration>,
}

impl MockService {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps for `delay` before answering
    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub(crate) fn reply(&self, method: &str, key: impl ToString, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .insert((method.to_string(), key.to_string()), reply);
    }

    /// Fail the next `times` calls for (method, key) with a transient error
    pub(crate) fn fail_transiently(&self, method: &str, key: impl ToString, times: u32) {
        self.transient_failures
            .lock()
            .unwrap()
            .insert((method.to_string(), key.to_string()), times);
    }

    /// Register a public photo by `straup` taken 2018-11-26 with Medium and Original sizes
    pub(crate) fn photo(&self, id: i64, image_base: &str) {
        self.reply(methods::GET_INFO, id, Reply::Body(info_json(id, true)));
        self.reply(methods::GET_SIZES, id, Reply::Body(sizes_json(id, image_base)));
    }

    /// Register listing page `page` of `pages`
    pub(crate) fn page(&self, method: &str, page: u32, pages: u32, ids: &[i64]) {
        let photos: Vec<String> = ids.iter().map(|id| format!(r#"{{"id":"{id}"}}"#)).collect();
        self.reply(
            method,
            page,
            Reply::Body(format!(
                r#"{{"photos":{{"page":{page},"pages":{pages},"photo":[{}]}},"stat":"ok"}}"#,
                photos.join(",")
            )),
        );
    }

    /// Parameters of every call to `method`, in call order
    pub(crate) fn calls_for(&self, method: &str) -> Vec<Query> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, q)| q.clone())
            .collect()
    }

    /// `photo_id`s passed to `method`, in call order
    pub(crate) fn photo_ids_for(&self, method: &str) -> Vec<i64> {
        self.calls_for(method)
            .iter()
            .filter_map(|q| q.get("photo_id").and_then(|id| id.parse().ok()))
            .collect()
    }
}

#[async_trait]
impl MetadataService for MockService {
    async fn execute(&self, method: &str, params: &Query) -> Result<Vec<u8>> {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), params.clone()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let key_value = params
            .get("photo_id")
            .or_else(|| params.get("page"))
            .unwrap_or_default()
            .to_string();
        let key = (method.to_string(), key_value);

        {
            let mut failures = self.transient_failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(&key) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(Error::Io(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        "connection reset by peer",
                    )));
                }
            }
        }

        let reply = self.replies.lock().unwrap().get(&key).cloned();
        match reply {
            Some(Reply::Body(body)) => {
                check_status(body.as_bytes())?;
                Ok(body.into_bytes())
            }
            Some(Reply::Transport) => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ))),
            None => Err(Error::RemoteService {
                code: 1,
                message: "Photo not found".to_string(),
            }),
        }
    }
}

pub(crate) fn info_json(id: i64, public: bool) -> String {
    format!(
        r#"{{"photo":{{"id":"{id}","secret":"sec{id}","originalsecret":"orig{id}","owner":{{"nsid":"35034348999@N01","username":"straup"}},"dates":{{"taken":"2018-11-26 10:22:01"}},"visibility":{{"ispublic":{}}}}},"stat":"ok"}}"#,
        u8::from(public)
    )
}

pub(crate) fn sizes_json(id: i64, image_base: &str) -> String {
    format!(
        r#"{{"sizes":{{"size":[
            {{"label":"Medium","width":500,"height":375,"source":"{image_base}/photos/{id}_sec{id}.jpg"}},
            {{"label":"Original","width":4032,"height":3024,"source":"{image_base}/photos/{id}_orig{id}_o.jpg"}}
        ]}},"stat":"ok"}}"#
    )
}

/// HTTP server answering every `/photos/...` GET with [`IMAGE_BYTES`]
pub(crate) async fn image_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex("^/photos/.+"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(IMAGE_BYTES))
        .mount(&server)
        .await;
    server
}

/// Config with no throttling, fast retries and a fixed username
pub(crate) fn test_config() -> Config {
    let mut config = Config::default();
    config.username = Some("straup".to_string());
    config.throttle.requests_per_second = 0;
    config.retry = RetryConfig {
        max_attempts: 2,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        backoff_multiplier: 2.0,
        jitter: false,
    };
    config
}

pub(crate) fn create_test_archivist(
    config: Config,
    service: Arc<MockService>,
    store: Arc<MemoryStore>,
) -> Archivist {
    Archivist::new(config, service, store).unwrap()
}
