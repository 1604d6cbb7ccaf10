// File: kickwatch-core/tests/test_utils/mod.rs
//
// Shared stubs for the integration tests. Not every test binary uses every helper.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use async_trait::async_trait;
use tokio::sync::Notify;

use kickwatch_common::models::{ChannelStatus, FollowRecord};
use kickwatch_common::traits::{ChannelFetcher, FollowDocumentRepository};
use kickwatch_core::http::{HttpClient, HttpResponse};
use kickwatch_core::{Error, FetchError};

/// Serves canned responses keyed by URL and records every requested URL.
#[derive(Default)]
pub struct StubHttpClient {
    responses: HashMap<String, Result<HttpResponse, String>>,
    pub requests: Mutex<Vec<String>>,
}

impl StubHttpClient {
    pub fn with(mut self, url: &str, response: HttpResponse) -> Self {
        self.responses.insert(url.to_string(), Ok(response));
        self
    }

    pub fn with_transport_error(mut self, url: &str, message: &str) -> Self {
        self.responses.insert(url.to_string(), Err(message.to_string()));
        self
    }
}

#[async_trait]
impl HttpClient for StubHttpClient {
    type Error = Error;

    async fn get(&self, url: String, _headers: HashMap<String, String>) -> Result<HttpResponse, Self::Error> {
        self.requests.lock().unwrap().push(url.clone());
        match self.responses.get(&url) {
            Some(Ok(resp)) => Ok(resp.clone()),
            Some(Err(msg)) => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                msg.clone(),
            ))),
            None => Ok(HttpResponse {
                status: 404,
                content_type: Some("text/plain".to_string()),
                body: "Not Found".to_string(),
            }),
        }
    }
}

pub fn json_response(body: serde_json::Value) -> HttpResponse {
    HttpResponse {
        status: 200,
        content_type: Some("application/json; charset=utf-8".to_string()),
        body: body.to_string(),
    }
}

pub fn live(slug: &str, viewers: u64) -> ChannelStatus {
    let mut s = ChannelStatus::offline(slug);
    s.is_live = true;
    s.viewer_count = Some(viewers);
    s.title = Some(format!("{} live", slug));
    s.playback_url = Some(format!("https://video.example/{}.m3u8", slug));
    s
}

pub fn offline(slug: &str) -> ChannelStatus {
    ChannelStatus::offline(slug)
}

pub fn slugs(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Fetcher answering from a fixed table, optionally holding chosen slugs until released.
#[derive(Default)]
pub struct StubFetcher {
    table: Mutex<HashMap<String, Result<ChannelStatus, FetchError>>>,
    gates: Mutex<HashMap<String, std::sync::Arc<Notify>>>,
    pub started: Notify,
    pub calls: AtomicUsize,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, slug: &str, result: Result<ChannelStatus, FetchError>) {
        self.table.lock().unwrap().insert(slug.to_string(), result);
    }

    pub fn with(self, slug: &str, result: Result<ChannelStatus, FetchError>) -> Self {
        self.set(slug, result);
        self
    }

    /// Lookups for `slug` block until `release(slug)`.
    pub fn hold(&self, slug: &str) {
        self.gates
            .lock()
            .unwrap()
            .insert(slug.to_string(), std::sync::Arc::new(Notify::new()));
    }

    pub fn release(&self, slug: &str) {
        if let Some(gate) = self.gates.lock().unwrap().get(slug) {
            gate.notify_one();
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChannelFetcher for StubFetcher {
    async fn fetch_channel(&self, slug: &str) -> Result<ChannelStatus, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().unwrap().get(slug).cloned();
        if let Some(gate) = gate {
            self.started.notify_one();
            gate.notified().await;
        }
        self.table
            .lock()
            .unwrap()
            .get(slug)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::Http { status: 404, body_excerpt: "Not Found".to_string() }))
    }
}

/// In-memory per-user document collection; `fail` makes every call error out.
#[derive(Default)]
pub struct InMemoryDocumentRepo {
    docs: Mutex<HashMap<String, Vec<FollowRecord>>>,
    pub fail: AtomicBool,
}

impl InMemoryDocumentRepo {
    fn check(&self) -> Result<(), Error> {
        if self.fail.load(Ordering::SeqCst) {
            Err(Error::Store("document store unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl FollowDocumentRepository for InMemoryDocumentRepo {
    async fn list_follow_ids(&self, user_id: &str) -> Result<Vec<String>, Error> {
        self.check()?;
        Ok(self
            .docs
            .lock()
            .unwrap()
            .get(user_id)
            .map(|records| records.iter().map(|r| r.slug.clone()).collect())
            .unwrap_or_default())
    }

    async fn upsert_follow(&self, user_id: &str, record: &FollowRecord) -> Result<(), Error> {
        self.check()?;
        let mut docs = self.docs.lock().unwrap();
        let records = docs.entry(user_id.to_string()).or_default();
        if !records.iter().any(|r| r.slug == record.slug) {
            records.push(record.clone());
        }
        Ok(())
    }

    async fn delete_follow(&self, user_id: &str, slug: &str) -> Result<(), Error> {
        self.check()?;
        if let Some(records) = self.docs.lock().unwrap().get_mut(user_id) {
            records.retain(|r| r.slug != slug);
        }
        Ok(())
    }
}
