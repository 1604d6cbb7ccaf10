// File: kickwatch-common/src/models/channel.rs

use std::collections::HashMap;
use serde::{Deserialize, Serialize};

/// Latest known snapshot of one Kick channel.
///
/// A record with `error` set describes a failed lookup for `slug`; its other
/// fields carry no live/offline fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStatus {
    pub slug: String,
    pub name: String,
    pub profile_pic: Option<String>,
    pub title: Option<String>,
    pub is_live: bool,
    /// `None` means "no data", which ranks below an explicit zero.
    pub viewer_count: Option<u64>,
    pub category: Option<String>,
    pub playback_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub error: Option<String>,
}

impl ChannelStatus {
    /// Defaults for a channel the upstream told us nothing about.
    pub fn offline(slug: &str) -> Self {
        Self {
            slug: slug.to_string(),
            name: slug.to_string(),
            profile_pic: None,
            title: None,
            is_live: false,
            viewer_count: Some(0),
            category: None,
            playback_url: None,
            thumbnail_url: None,
            error: None,
        }
    }

    pub fn failed(slug: &str, message: impl Into<String>) -> Self {
        Self {
            slug: slug.to_string(),
            name: slug.to_string(),
            profile_pic: None,
            title: None,
            is_live: false,
            viewer_count: None,
            category: None,
            playback_url: None,
            thumbnail_url: None,
            error: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Viewer count used for ordering; unknown sorts below zero.
    pub fn ranking_viewers(&self) -> i64 {
        self.viewer_count.map(|v| v as i64).unwrap_or(-1)
    }
}

/// slug -> latest status, rebuilt wholesale on every reconciliation pass.
pub type StatusMapping = HashMap<String, ChannelStatus>;
