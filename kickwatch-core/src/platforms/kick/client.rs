// File: kickwatch-core/src/platforms/kick/client.rs

use std::collections::HashMap;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use kickwatch_common::models::ChannelStatus;
use kickwatch_common::traits::ChannelFetcher;
use crate::http::{HttpClient, HttpResponse};
use crate::FetchError;
use super::normalizer::normalize_channel;

/// How much of an error body is kept in `FetchError::Http`.
pub const BODY_EXCERPT_CHARS: usize = 120;

/// Channel-status lookups against the Kick v1 channel endpoint.
///
/// One GET per call, no retries. The response is classified here; turning a
/// decoded payload into a `ChannelStatus` is the normalizer's job.
pub struct KickClient<H: HttpClient> {
    http: H,
    base_url: String,
}

impl<H: HttpClient> KickClient<H> {
    pub fn new(http: H, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn http(&self) -> &H {
        &self.http
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn channel_url(&self, slug: &str) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(slug))
    }

    /// Performs the request and returns the decoded JSON body.
    pub async fn fetch_raw(&self, slug: &str) -> Result<Value, FetchError> {
        let url = self.channel_url(slug);
        debug!("Fetching Kick channel '{}' from {}", slug, url);

        let mut headers = HashMap::new();
        headers.insert("Accept".to_string(), "application/json".to_string());

        let response = self
            .http
            .get(url, headers)
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        classify(response)
    }
}

fn classify(response: HttpResponse) -> Result<Value, FetchError> {
    if !response.is_success() {
        let excerpt: String = response.body.chars().take(BODY_EXCERPT_CHARS).collect();
        let body_excerpt = if excerpt.is_empty() { "Unknown error".to_string() } else { excerpt };
        return Err(FetchError::Http { status: response.status, body_excerpt });
    }

    let content_type = response.content_type.unwrap_or_default();
    if !content_type.contains("application/json") {
        return Err(FetchError::UnexpectedContentType { content_type });
    }

    serde_json::from_str(&response.body).map_err(|e| FetchError::Parse(e.to_string()))
}

#[async_trait]
impl<H: HttpClient> ChannelFetcher for KickClient<H> {
    async fn fetch_channel(&self, slug: &str) -> Result<ChannelStatus, FetchError> {
        match self.fetch_raw(slug).await {
            Ok(payload) => Ok(normalize_channel(&payload, slug)),
            Err(e) => {
                warn!("Kick lookup for '{}' failed: {}", slug, e);
                Err(e)
            }
        }
    }
}

/// Kick's chat popout for a channel.
pub fn chat_url(slug: &str) -> String {
    format!("https://kick.com/{}/chatroom", urlencoding::encode(slug))
}
