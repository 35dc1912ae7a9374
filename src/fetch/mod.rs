//! Catalog retrieval.
//!
//! The browser core only sees the [`FeedFetcher`] trait: anything that can
//! turn a URL into a parsed [`Feed`]. [`HttpFetcher`] is the production
//! implementation; tests substitute in-memory fetchers.

mod http;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::catalog::{Feed, ParseError};
use crate::util::UrlValidationError;

pub use http::{Credentials, FetchSettings, HttpFetcher};

/// Errors that can occur while fetching a catalog feed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL failed validation (scheme, SSRF policy)
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] UrlValidationError),
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Body could not be parsed as an OPDS feed
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    /// Server returned 429 Too Many Requests after max retries
    #[error("Rate limited after {0} retries")]
    RateLimited(u32),
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
    /// The task running the fetch panicked before producing a result
    #[error("Fetch task aborted: {0}")]
    Aborted(String),
}

impl FetchError {
    /// Short hint shown next to the error in the status line.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::HttpStatus(401) | Self::HttpStatus(403) => {
                Some("check the catalog credentials in config.toml")
            }
            Self::InvalidUrl(UrlValidationError::PrivateIp(_))
            | Self::InvalidUrl(UrlValidationError::Localhost) => {
                Some("set allow_private_networks = true for local servers")
            }
            _ => None,
        }
    }
}

/// Source of parsed catalog feeds.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetches and parses the feed at `url`.
    async fn fetch(&self, url: &Url) -> Result<Feed, FetchError>;

    /// Fetches `url` bypassing any cache the implementation keeps.
    async fn fetch_fresh(&self, url: &Url) -> Result<Feed, FetchError> {
        self.fetch(url).await
    }
}
