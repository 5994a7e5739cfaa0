//! Document retrieval
//!
//! This module handles all HTTP requests for the harvester, including:
//! - Building HTTP clients with the configured user agent and timeouts
//! - GET requests for listing and detail pages
//! - Classifying failures as transient (worth retrying) or not

use crate::config::FetchConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Failure to retrieve one document
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Network error, timeout, 5xx or 429; a later attempt may succeed
    #[error("Transient failure fetching {url}: {message}")]
    Transient { url: String, message: String },

    /// Any other non-success status; retrying will not help
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },
}

impl FetchError {
    pub fn transient(url: &str, message: impl Into<String>) -> Self {
        Self::Transient {
            url: url.to_string(),
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Something that can retrieve the raw document behind a URL
///
/// The listing fetcher and the detail fetcher each hold their own source.
/// Detail sources are shared by every detail task and must be safe for
/// concurrent use.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn get(&self, url: &str) -> Result<String, FetchError>;
}

/// `DocumentSource` backed by a `reqwest::Client`
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a source with its own client from the fetch configuration
    pub fn from_config(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(config)?))
    }
}

#[async_trait]
impl DocumentSource for HttpSource {
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::transient(url, classify_request_error(&e)))?;

        let status = response.status();
        if is_transient_status(status) {
            return Err(FetchError::transient(url, format!("HTTP {}", status.as_u16())));
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::transient(url, format!("reading body: {}", e)))
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use kin_harvest::config::FetchConfig;
/// use kin_harvest::harvester::build_http_client;
///
/// let client = build_http_client(&FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.request_timeout())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

fn classify_request_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timeout".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    }
}
