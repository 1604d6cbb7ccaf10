// File: kickwatch-core/src/follows/store.rs

use std::sync::Arc;
use async_trait::async_trait;
use chrono::Duration;
use tracing::{debug, info, warn};

use kickwatch_common::error::Error;
use kickwatch_common::models::{FollowRecord, IdentityContext};
use kickwatch_common::traits::{CookieJar, FollowDocumentRepository, FollowStore};

pub const GUEST_COOKIE_NAME: &str = "kick_guest_follows";
pub const GUEST_COOKIE_TTL_DAYS: i64 = 30;

/// Canonical slug form: trimmed and lowercased. Empty means "nothing to do".
pub fn normalize_slug(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Follows of a signed-in user, one document per slug.
pub struct AuthenticatedFollowStore {
    user_id: String,
    documents: Arc<dyn FollowDocumentRepository>,
}

impl AuthenticatedFollowStore {
    pub fn new(user_id: &str, documents: Arc<dyn FollowDocumentRepository>) -> Self {
        Self {
            user_id: user_id.to_string(),
            documents,
        }
    }
}

#[async_trait]
impl FollowStore for AuthenticatedFollowStore {
    fn backend_name(&self) -> &'static str {
        "authenticated"
    }

    async fn list(&self) -> Result<Vec<String>, Error> {
        self.documents.list_follow_ids(&self.user_id).await
    }

    async fn add(&self, slug: &str) -> Result<(), Error> {
        let slug = normalize_slug(slug);
        if slug.is_empty() {
            return Ok(());
        }
        debug!("Upserting follow '{}' for user {}", slug, self.user_id);
        self.documents
            .upsert_follow(&self.user_id, &FollowRecord::new(&slug))
            .await
    }

    async fn remove(&self, slug: &str) -> Result<(), Error> {
        let slug = normalize_slug(slug);
        if slug.is_empty() {
            return Ok(());
        }
        debug!("Deleting follow '{}' for user {}", slug, self.user_id);
        self.documents.delete_follow(&self.user_id, &slug).await
    }
}

/// Follows of a guest, kept as a JSON array in one cookie.
pub struct AnonymousFollowStore {
    cookies: Arc<dyn CookieJar>,
}

impl AnonymousFollowStore {
    pub fn new(cookies: Arc<dyn CookieJar>) -> Self {
        Self { cookies }
    }

    async fn write(&self, follows: &[String]) -> Result<(), Error> {
        let raw = serde_json::to_string(follows)?;
        self.cookies
            .set(GUEST_COOKIE_NAME, &raw, Duration::days(GUEST_COOKIE_TTL_DAYS))
            .await
    }
}

#[async_trait]
impl FollowStore for AnonymousFollowStore {
    fn backend_name(&self) -> &'static str {
        "anonymous"
    }

    async fn list(&self) -> Result<Vec<String>, Error> {
        let Some(raw) = self.cookies.get(GUEST_COOKIE_NAME).await? else {
            return Ok(Vec::new());
        };
        let parsed: Vec<String> = match serde_json::from_str(&raw) {
            Ok(list) => list,
            Err(e) => {
                warn!("Guest follow cookie is not a JSON list, treating as empty: {}", e);
                return Ok(Vec::new());
            }
        };

        let mut out: Vec<String> = Vec::with_capacity(parsed.len());
        for slug in parsed.iter().map(|s| normalize_slug(s)) {
            if !slug.is_empty() && !out.contains(&slug) {
                out.push(slug);
            }
        }
        Ok(out)
    }

    async fn add(&self, slug: &str) -> Result<(), Error> {
        let slug = normalize_slug(slug);
        if slug.is_empty() {
            return Ok(());
        }
        let mut follows = self.list().await?;
        if !follows.contains(&slug) {
            follows.push(slug);
        }
        self.write(&follows).await
    }

    async fn remove(&self, slug: &str) -> Result<(), Error> {
        let slug = normalize_slug(slug);
        let mut follows = self.list().await?;
        follows.retain(|s| *s != slug);
        self.write(&follows).await
    }
}

/// The persistence options available to a session; one is picked per identity.
#[derive(Clone)]
pub struct FollowBackends {
    documents: Option<Arc<dyn FollowDocumentRepository>>,
    cookies: Arc<dyn CookieJar>,
}

impl FollowBackends {
    pub fn new(
        documents: Option<Arc<dyn FollowDocumentRepository>>,
        cookies: Arc<dyn CookieJar>,
    ) -> Self {
        Self { documents, cookies }
    }

    pub fn has_documents(&self) -> bool {
        self.documents.is_some()
    }

    /// `Ok(None)` for the `None` identity.
    pub fn store_for(&self, identity: &IdentityContext) -> Result<Option<Arc<dyn FollowStore>>, Error> {
        let store: Arc<dyn FollowStore> = match identity {
            IdentityContext::None => return Ok(None),
            IdentityContext::Anonymous => Arc::new(AnonymousFollowStore::new(self.cookies.clone())),
            IdentityContext::Authenticated { user_id } => {
                let documents = self.documents.clone().ok_or_else(|| {
                    Error::Store("authenticated follows need a document store (DATABASE_URL)".to_string())
                })?;
                Arc::new(AuthenticatedFollowStore::new(user_id, documents))
            }
        };
        info!("Follow store for identity {} is '{}'", identity, store.backend_name());
        Ok(Some(store))
    }
}
