// File: kickwatch-common/src/traits/repository_traits.rs

use async_trait::async_trait;
use chrono::Duration;
use crate::error::Error;
use crate::models::FollowRecord;

/// The follow list of one identity. Two backends exist (authenticated documents
/// and the anonymous cookie); callers never branch on which one they hold.
#[async_trait]
pub trait FollowStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Followed slugs in insertion order.
    async fn list(&self) -> Result<Vec<String>, Error>;

    /// Trims and lowercases `slug` first; an empty result is a silent no-op.
    async fn add(&self, slug: &str) -> Result<(), Error>;

    async fn remove(&self, slug: &str) -> Result<(), Error>;
}

/// Per-user keyed collection of follow documents (document id = slug).
#[async_trait]
pub trait FollowDocumentRepository: Send + Sync {
    /// Document ids, oldest first.
    async fn list_follow_ids(&self, user_id: &str) -> Result<Vec<String>, Error>;
    async fn upsert_follow(&self, user_id: &str, record: &FollowRecord) -> Result<(), Error>;
    async fn delete_follow(&self, user_id: &str, slug: &str) -> Result<(), Error>;
}

/// Minimal client-side cookie storage: named string values with an expiry.
#[async_trait]
pub trait CookieJar: Send + Sync {
    /// `None` when the cookie is missing or expired.
    async fn get(&self, name: &str) -> Result<Option<String>, Error>;
    async fn set(&self, name: &str, value: &str, ttl: Duration) -> Result<(), Error>;
    async fn remove(&self, name: &str) -> Result<(), Error>;
}
