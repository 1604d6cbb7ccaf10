//! HTTP Client abstraction layer for the upstream channel API
//!
//! The fetcher talks to Kick only through [`HttpClient`], which keeps the
//! status code, the content type and the raw body together so that the caller
//! decides what counts as a failure. Tests substitute a stub that serves canned
//! responses without touching the network.
//!
//! # Example Usage:
//! ```ignore
//! use kickwatch_core::http::{HttpClient, DefaultHttpClient};
//! use kickwatch_core::platforms::kick::KickClient;
//!
//! // In production code
//! let kick = KickClient::new(DefaultHttpClient::new(), "https://kick.com/api/v1/channels");
//!
//! // In tests, any HttpClient implementation can be handed over instead
//! let kick = KickClient::new(StubHttpClient::default(), "http://stub");
//! ```

use async_trait::async_trait;
use reqwest;
use reqwest::header::CONTENT_TYPE;
use std::collections::HashMap;
use std::time::Duration;
use crate::Error;

/// What came back from a GET, whatever the status code.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A generic trait for making HTTP requests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn get(&self, url: String, headers: HashMap<String, String>) -> Result<HttpResponse, Self::Error>;
}

#[derive(Clone)]
pub struct DefaultHttpClient {
    client: reqwest::Client,
}

impl DefaultHttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Client whose requests are abandoned after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl Default for DefaultHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for DefaultHttpClient {
    type Error = Error;

    async fn get(&self, url: String, headers: HashMap<String, String>) -> Result<HttpResponse, Self::Error> {
        let mut request = self.client.get(&url);
        for (key, value) in headers {
            request = request.header(&key, value);
        }
        let response = request.send().await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = response.text().await?;

        Ok(HttpResponse { status, content_type, body })
    }
}
