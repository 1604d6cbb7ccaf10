// File: kickwatch-core/src/platforms/kick/fallback.rs
//
// Bundled records for a fixed set of well-known channels, used when Kick is
// unreachable during development and demos. Slugs outside the table never get
// substituted data.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use kickwatch_common::models::ChannelStatus;
use kickwatch_common::traits::ChannelFetcher;
use crate::FetchError;
use super::normalizer::normalize_channel;

/// Slugs the fallback table knows about.
pub const FALLBACK_SLUGS: &[&str] = &["ebonivon", "eray"];

fn fallback_payload(slug: &str) -> Option<Value> {
    match slug {
        "ebonivon" => Some(json!({
            "slug": "ebonivon",
            "user": {
                "username": "Ebonivon",
                "bio": "The Ebonivon",
                "profile_pic": "https://files.kick.com/images/user/27120330/profile_image/conversion/a627ec1c-e650-4dbf-b294-812b07884b2f-fullsize.webp"
            },
            "followersCount": 442397,
            "livestream": {
                "is_live": true,
                "playback_url": "https://fa723fc1b171.us-west-2.playback.live-video.net/api/video/v1/us-west-2.196233775518.channel.FVUTwgBcOK8j.m3u8",
                "session_title": "Mock yayın",
                "viewer_count": 412,
                "category": { "name": "Just Chatting" }
            }
        })),
        "eray" => Some(json!({
            "slug": "eray",
            "user": {
                "username": "Eray",
                "bio": "For Communication and Sponsorships: mail@eozkenar.com",
                "profile_pic": "https://files.kick.com/images/user/11096104/profile_image/conversion/da996ef7-742a-4b50-8a9d-15045762577e-fullsize.webp"
            },
            "followersCount": 578452,
            "playback_url": "https://fa723fc1b171.us-west-2.playback.live-video.net/api/video/v1/us-west-2.196233775518.channel.Q9ODDTRmrmeT.m3u8",
            "livestream": {
                "is_live": false,
                "session_title": "Örnek veri",
                "viewer_count": 0,
                "category": { "name": "Just Chatting" }
            }
        })),
        _ => None,
    }
}

/// Normalized bundled record for `slug` (case-insensitive), if the table has one.
pub fn fallback_channel(slug: &str) -> Option<ChannelStatus> {
    let key = slug.trim().to_lowercase();
    fallback_payload(&key).map(|payload| normalize_channel(&payload, &key))
}

/// Wraps a fetcher and answers failed lookups from the fallback table.
pub struct WithFallback<F: ChannelFetcher> {
    inner: F,
    enabled: bool,
}

impl<F: ChannelFetcher> WithFallback<F> {
    pub fn new(inner: F, enabled: bool) -> Self {
        Self { inner, enabled }
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }
}

#[async_trait]
impl<F: ChannelFetcher> ChannelFetcher for WithFallback<F> {
    async fn fetch_channel(&self, slug: &str) -> Result<ChannelStatus, FetchError> {
        match self.inner.fetch_channel(slug).await {
            Ok(status) => Ok(status),
            Err(e) if self.enabled => match fallback_channel(slug) {
                Some(status) => {
                    info!("Using bundled fallback record for '{}' ({})", slug, e);
                    Ok(status)
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }
}
