//! Common test utilities for flickr-archive integration tests
//!
//! A single wiremock server plays both the REST endpoint (`POST /rest`) and
//! the image CDN (`GET /photos/...`).

#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;
use walkdir::WalkDir;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use flickr_archive::Config;
use flickr_archive::config::RetryConfig;

pub const API_KEY: &str = "test-api-key";
pub const IMAGE_BYTES: &[u8] = b"\xFF\xD8\xFFintegration-jpeg";

pub struct FakeFlickr {
    pub server: MockServer,
}

impl FakeFlickr {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex("^/photos/.+"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(IMAGE_BYTES))
            .mount(&server)
            .await;
        Self { server }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/rest", self.server.uri())
    }

    /// Answer `method` for `photo_id` with `body`
    pub async fn photo_method(&self, flickr_method: &str, photo_id: i64, body: String) {
        Mock::given(method("POST"))
            .and(path("/rest"))
            .and(query_param("method", flickr_method))
            .and(query_param("photo_id", photo_id.to_string()))
            .and(query_param("api_key", API_KEY))
            .and(query_param("format", "json"))
            .and(query_param("nojsoncallback", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    /// Register info and sizes for a public photo by `straup` taken 2018-11-26
    pub async fn photo(&self, id: i64) {
        self.photo_method("flickr.photos.getInfo", id, info_json(id)).await;
        self.photo_method(
            "flickr.photos.getSizes",
            id,
            format!(
                r#"{{"sizes":{{"size":[
                    {{"label":"Large","width":1024,"height":768,"source":"{base}/photos/{id}_sec{id}_b.jpg"}},
                    {{"label":"Original","width":4032,"height":3024,"source":"{base}/photos/{id}_orig{id}_o.jpg"}}
                ]}},"stat":"ok"}}"#,
                base = self.server.uri()
            ),
        )
        .await;
    }

    /// Register search page `page` of `pages`
    pub async fn search_page(&self, page: u32, pages: u32, ids: &[i64]) {
        let photos: Vec<String> = ids.iter().map(|id| format!(r#"{{"id":"{id}"}}"#)).collect();
        Mock::given(method("POST"))
            .and(path("/rest"))
            .and(query_param("method", "flickr.photos.search"))
            .and(query_param("page", page.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                r#"{{"photos":{{"page":"{page}","pages":"{pages}","perpage":100,"photo":[{}]}},"stat":"ok"}}"#,
                photos.join(",")
            )))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Every REST call fails with `code`
    pub async fn reject_all(&self, code: i64, message: &str) {
        Mock::given(method("POST"))
            .and(path("/rest"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                r#"{{"stat":"fail","code":{code},"message":"{message}"}}"#
            )))
            .mount(&self.server)
            .await;
    }

    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.api.endpoint = self.endpoint();
        config.api.api_key = API_KEY.to_string();
        config.username = Some("straup".to_string());
        config.throttle.requests_per_second = 0;
        config.retry = RetryConfig {
            max_attempts: 1,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            jitter: false,
        };
        config
    }
}

pub fn info_json(id: i64) -> String {
    format!(
        r#"{{"photo":{{"id":"{id}","secret":"sec{id}","originalsecret":"orig{id}","owner":{{"username":"straup"}},"dates":{{"taken":"2018-11-26 10:22:01"}},"visibility":{{"ispublic":1}}}},"stat":"ok"}}"#
    )
}

/// Every file under `root`, relative and sorted
pub fn archived_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(root)
                .ok()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
        })
        .collect();
    files.sort();
    files
}
