// File: kickwatch-common/src/traits/api.rs

use async_trait::async_trait;
use crate::error::FetchError;
use crate::models::ChannelStatus;

/// Looks up the current status of one channel.
///
/// Implementations perform exactly one upstream lookup per call and never retry;
/// retry policy belongs to the caller.
#[async_trait]
pub trait ChannelFetcher: Send + Sync {
    async fn fetch_channel(&self, slug: &str) -> Result<ChannelStatus, FetchError>;

    /// Playback data comes from the same channel endpoint.
    async fn fetch_playback(&self, slug: &str) -> Result<ChannelStatus, FetchError> {
        self.fetch_channel(slug).await
    }
}
