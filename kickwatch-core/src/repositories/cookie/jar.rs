// File: kickwatch-core/src/repositories/cookie/jar.rs
//
// Cookie storage for anonymous sessions. `FileCookieJar` keeps the cookies of
// the local guest session in a JSON file; `MemoryCookieJar` is the same thing
// without persistence.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use kickwatch_common::error::Error;
use kickwatch_common::traits::CookieJar;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl StoredCookie {
    fn new(value: &str, ttl: Duration) -> Self {
        Self {
            value: value.to_string(),
            expires_at: Utc::now() + ttl,
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

type CookieMap = HashMap<String, StoredCookie>;

#[derive(Default)]
pub struct MemoryCookieJar {
    cookies: Mutex<CookieMap>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a cookie with an explicit expiry, e.g. one already in the past.
    pub async fn insert_raw(&self, name: &str, cookie: StoredCookie) {
        self.cookies.lock().await.insert(name.to_string(), cookie);
    }
}

#[async_trait]
impl CookieJar for MemoryCookieJar {
    async fn get(&self, name: &str) -> Result<Option<String>, Error> {
        let cookies = self.cookies.lock().await;
        Ok(cookies
            .get(name)
            .filter(|c| !c.is_expired(Utc::now()))
            .map(|c| c.value.clone()))
    }

    async fn set(&self, name: &str, value: &str, ttl: Duration) -> Result<(), Error> {
        self.cookies
            .lock()
            .await
            .insert(name.to_string(), StoredCookie::new(value, ttl));
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<(), Error> {
        self.cookies.lock().await.remove(name);
        Ok(())
    }
}

/// Whole jar rewritten on every mutation; reads go to disk each time.
pub struct FileCookieJar {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCookieJar {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<CookieMap, Error> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(CookieMap::new()),
            Err(e) => return Err(Error::Io(e)),
        };
        match serde_json::from_str::<CookieMap>(&raw) {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!("Ignoring unreadable cookie file {}: {}", self.path.display(), e);
                Ok(CookieMap::new())
            }
        }
    }

    async fn save(&self, cookies: &CookieMap) -> Result<(), Error> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_string_pretty(cookies)?;
        tokio::fs::write(&self.path, raw).await?;
        debug!("Wrote {} cookie(s) to {}", cookies.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl CookieJar for FileCookieJar {
    async fn get(&self, name: &str) -> Result<Option<String>, Error> {
        let cookies = self.load().await?;
        Ok(cookies
            .get(name)
            .filter(|c| !c.is_expired(Utc::now()))
            .map(|c| c.value.clone()))
    }

    async fn set(&self, name: &str, value: &str, ttl: Duration) -> Result<(), Error> {
        let _guard = self.write_lock.lock().await;
        let now = Utc::now();
        let mut cookies = self.load().await?;
        cookies.retain(|_, c| !c.is_expired(now));
        cookies.insert(name.to_string(), StoredCookie::new(value, ttl));
        self.save(&cookies).await
    }

    async fn remove(&self, name: &str) -> Result<(), Error> {
        let _guard = self.write_lock.lock().await;
        let mut cookies = self.load().await?;
        if cookies.remove(name).is_some() {
            self.save(&cookies).await?;
        }
        Ok(())
    }
}
