//! HTTP client for the Flickr REST endpoint

use async_trait::async_trait;
use tracing::debug;

use super::response::check_status;
use super::{MetadataService, Query};
use crate::config::ApiConfig;
use crate::error::{Error, Result};

/// Build the HTTP client shared by API calls and binary downloads
///
/// # Errors
/// Returns error if the underlying TLS backend cannot be initialised
pub fn build_http_client(config: &ApiConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))
}

/// [`MetadataService`] backed by the Flickr REST API
///
/// Every call is a POST to the configured endpoint with the parameters in the
/// query string, asking for plain JSON (`format=json&nojsoncallback=1`).
#[derive(Clone)]
pub struct FlickrClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    api_secret: Option<String>,
    sign_requests: bool,
}

impl FlickrClient {
    /// Create a client from API settings
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &ApiConfig) -> Result<Self> {
        Ok(Self::with_http(config, build_http_client(config)?))
    }

    /// Create a client that reuses an existing HTTP client
    pub fn with_http(config: &ApiConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            sign_requests: config.sign_requests,
        }
    }

    /// The full parameter set sent for `method`
    pub(crate) fn prepare(&self, method: &str, params: &Query) -> Result<Query> {
        let mut query = params.clone();
        query.set("method", method);
        query.set("format", "json");
        query.set("nojsoncallback", "1");
        query.set("api_key", self.api_key.as_str());
        query.remove("api_sig");

        if self.sign_requests {
            let secret = self.api_secret.as_deref().ok_or_else(|| Error::Config {
                message: "request signing requires an API secret".to_string(),
                key: Some("api.api_secret".to_string()),
            })?;
            let signature = sign(secret, &query);
            query.set("api_sig", signature);
        }

        Ok(query)
    }
}

/// Request signature: hex MD5 of the secret followed by every key and value in key order
pub fn sign(secret: &str, query: &Query) -> String {
    let mut payload = String::from(secret);
    for (key, value) in query.pairs() {
        payload.push_str(key);
        payload.push_str(value);
    }
    format!("{:x}", md5::compute(payload.as_bytes()))
}

#[async_trait]
impl MetadataService for FlickrClient {
    async fn execute(&self, method: &str, params: &Query) -> Result<Vec<u8>> {
        let query = self.prepare(method, params)?;
        let pairs: Vec<(&str, &str)> = query.pairs().collect();

        debug!(method, "Calling remote method");

        let response = self
            .http
            .post(&self.endpoint)
            .query(&pairs)
            .send()
            .await?
            .error_for_status()?;

        let body = response.bytes().await?.to_vec();
        check_status(&body)?;

        Ok(body)
    }
}

impl std::fmt::Debug for FlickrClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlickrClient")
            .field("endpoint", &self.endpoint)
            .field("sign_requests", &self.sign_requests)
            .finish_non_exhaustive()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(endpoint: &str) -> ApiConfig {
        ApiConfig {
            endpoint: endpoint.to_string(),
            api_key: "key123".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_sign_matches_reference_digest() {
        let query = Query::new()
            .with("method", "flickr.photos.getInfo")
            .with("api_key", "key123")
            .with("photo_id", "42");

        // md5("secret" + "api_keykey123" + "methodflickr.photos.getInfo" + "photo_id42")
        let expected = format!(
            "{:x}",
            md5::compute("secretapi_keykey123methodflickr.photos.getInfophoto_id42")
        );
        assert_eq!(sign("secret", &query), expected);
    }

    #[test]
    fn test_prepare_adds_standard_parameters() {
        let client = FlickrClient::new(&config("http://localhost/rest")).unwrap();

        let query = client
            .prepare("flickr.photos.getSizes", &Query::new().with("photo_id", "42"))
            .unwrap();

        assert_eq!(query.get("method"), Some("flickr.photos.getSizes"));
        assert_eq!(query.get("format"), Some("json"));
        assert_eq!(query.get("nojsoncallback"), Some("1"));
        assert_eq!(query.get("api_key"), Some("key123"));
        assert_eq!(query.get("photo_id"), Some("42"));
        assert_eq!(query.get("api_sig"), None);
    }

    #[test]
    fn test_prepare_signs_when_enabled() {
        let mut cfg = config("http://localhost/rest");
        cfg.api_secret = Some("shh".to_string());
        cfg.sign_requests = true;
        let client = FlickrClient::new(&cfg).unwrap();

        let query = client.prepare("flickr.photos.getInfo", &Query::new()).unwrap();

        let mut unsigned = query.clone();
        unsigned.remove("api_sig");
        assert_eq!(query.get("api_sig"), Some(sign("shh", &unsigned).as_str()));
    }

    #[test]
    fn test_prepare_signing_without_secret_is_config_error() {
        let mut cfg = config("http://localhost/rest");
        cfg.sign_requests = true;
        let client = FlickrClient::new(&cfg).unwrap();

        let err = client.prepare("flickr.photos.getInfo", &Query::new()).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[tokio::test]
    async fn test_execute_returns_body_on_ok() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest"))
            .and(query_param("method", "flickr.photos.getInfo"))
            .and(query_param("photo_id", "42"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"photo":{},"stat":"ok"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let client = FlickrClient::new(&config(&format!("{}/rest", server.uri()))).unwrap();
        let body = client
            .execute("flickr.photos.getInfo", &Query::new().with("photo_id", "42"))
            .await
            .unwrap();

        assert_eq!(body, br#"{"photo":{},"stat":"ok"}"#);
    }

    #[tokio::test]
    async fn test_execute_maps_fail_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"stat":"fail","code":96,"message":"Invalid signature"}"#),
            )
            .mount(&server)
            .await;

        let client = FlickrClient::new(&config(&server.uri())).unwrap();
        let err = client
            .execute("flickr.photos.getInfo", &Query::new())
            .await
            .unwrap_err();

        assert!(
            matches!(err, Error::RemoteService { code: 96, ref message } if message == "Invalid signature"),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn test_execute_http_error_is_network_error() {
        use crate::retry::IsRetryable;

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = FlickrClient::new(&config(&server.uri())).unwrap();
        let err = client
            .execute("flickr.photos.getInfo", &Query::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Network(_)), "got {err:?}");
        assert!(err.is_retryable());
    }
}
