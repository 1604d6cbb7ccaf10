// File: kickwatch-common/src/models/follow.rs

use serde::{Deserialize, Serialize};

/// One followed channel as stored by the authenticated backend.
/// The document id is the slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowRecord {
    pub slug: String,
    /// Epoch milliseconds.
    pub added_at: i64,
}

impl FollowRecord {
    pub fn new(slug: &str) -> Self {
        Self {
            slug: slug.to_string(),
            added_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}
