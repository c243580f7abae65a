//! HTTP fetch seam.
//!
//! The loader and the offline worker both talk to the network through the
//! `Fetch` trait, so the worker can sit in front of the loader and tests can
//! substitute an in-memory network.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use reqwest::{header, Client, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// HTTP request timeout in seconds.
/// The dataset is small; 30s tolerates slow mobile links.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Status returned when neither network nor cache can answer
pub const GATEWAY_TIMEOUT: u16 = 504;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Network(e.to_string())
    }
}

/// Whether intermediate HTTP caches may answer the request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheMode {
    #[default]
    Default,
    /// Always go to the origin
    NoStore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: Url,
    pub cache: CacheMode,
}

impl Request {
    pub fn get(url: Url) -> Self {
        Self {
            url,
            cache: CacheMode::Default,
        }
    }

    pub fn no_store(url: Url) -> Self {
        Self {
            url,
            cache: CacheMode::NoStore,
        }
    }

    /// Copy of this request that bypasses intermediate caches
    pub fn bypassing_cache(&self) -> Self {
        Self::no_store(self.url.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    /// Header names are stored lowercased
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(skip)]
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Explicit failure for an offline request with nothing cached
    pub fn unavailable() -> Self {
        Self::new(GATEWAY_TIMEOUT, Vec::new())
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Something that can answer requests: the network, or an interceptor in
/// front of it.
pub trait Fetch: Send + Sync {
    fn fetch(&self, request: &Request)
        -> impl Future<Output = Result<Response, FetchError>> + Send;
}

/// `Fetch` over real HTTP.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let mut builder = self.client.get(request.url.clone());
        if request.cache == CacheMode::NoStore {
            builder = builder
                .header(header::CACHE_CONTROL, "no-store")
                .header(header::PRAGMA, "no-cache");
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        debug!(url = %request.url, status, bytes = body.len(), "Fetched");
        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_ok_range() {
        assert!(Response::new(200, "x").ok());
        assert!(Response::new(204, "").ok());
        assert!(!Response::new(304, "").ok());
        assert!(!Response::new(404, "").ok());
        assert!(!Response::unavailable().ok());
        assert_eq!(Response::unavailable().status, 504);
        assert!(Response::unavailable().body.is_empty());
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = Response::new(200, "").with_header("Last-Modified", "x");
        assert_eq!(response.header("last-modified"), Some("x"));
        assert_eq!(response.header("LAST-MODIFIED"), Some("x"));
    }

    #[test]
    fn test_bypassing_cache() {
        let url = Url::parse("https://example.com/codes.csv").unwrap();
        let request = Request::get(url.clone());
        assert_eq!(request.cache, CacheMode::Default);
        assert_eq!(request.bypassing_cache(), Request::no_store(url));
    }
}
