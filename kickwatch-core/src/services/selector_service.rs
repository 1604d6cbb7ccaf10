// File: kickwatch-core/src/services/selector_service.rs
//
// Decides which channel is "now playing" and owns its playback lookup.
//
// Every change of the current slug bumps a generation counter and hands out a
// `PlaybackTicket`. A lookup result is applied only if its ticket still holds
// the latest generation, so a slow response for a channel the user already
// left is dropped on arrival. Superseded requests are not aborted.

use std::sync::Arc;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use kickwatch_common::error::FetchError;
use kickwatch_common::models::{ChannelStatus, StatusMapping};
use kickwatch_common::traits::ChannelFetcher;
use crate::follows::normalize_slug;
use crate::platforms::kick::chat_url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackTicket {
    pub slug: String,
    pub generation: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    /// Slug asked for from outside (route, explicit click).
    pub requested_slug: Option<String>,
    pub current_slug: Option<String>,
    /// Ticket of the most recent playback lookup; older tickets are stale.
    pub last_request: Option<PlaybackTicket>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub data: Option<ChannelStatus>,
    pub loading: bool,
    pub error: Option<String>,
}

/// What the player surface shows for the current channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NowPlaying {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub is_live: bool,
    pub viewer_count: Option<u64>,
    pub category: Option<String>,
    /// Absent means nothing to play, not an error.
    pub playback_url: Option<String>,
    pub chat_url: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Explicit request first, else the top live channel, else nothing.
pub fn decide_current(requested: Option<&str>, live_ranked: &[String]) -> Option<String> {
    if let Some(slug) = requested.map(normalize_slug).filter(|s| !s.is_empty()) {
        return Some(slug);
    }
    live_ranked.first().cloned()
}

#[derive(Default)]
struct SelectorInner {
    selection: SelectionState,
    generation: u64,
    playback: PlaybackState,
}

pub struct ActiveChannelSelector {
    fetcher: Arc<dyn ChannelFetcher>,
    inner: Mutex<SelectorInner>,
}

impl ActiveChannelSelector {
    pub fn new(fetcher: Arc<dyn ChannelFetcher>) -> Self {
        Self {
            fetcher,
            inner: Mutex::new(SelectorInner::default()),
        }
    }

    /// Re-evaluates the selection. Returns a ticket when the current slug
    /// changed to a channel whose playback data must now be looked up.
    pub async fn sync(&self, requested: Option<&str>, live_ranked: &[String]) -> Option<PlaybackTicket> {
        let next = decide_current(requested, live_ranked);
        let mut inner = self.inner.lock().await;
        inner.selection.requested_slug = requested.map(normalize_slug).filter(|s| !s.is_empty());

        if inner.selection.current_slug == next {
            return None;
        }

        info!("Now playing: {:?} -> {:?}", inner.selection.current_slug, next);
        inner.generation += 1;
        inner.selection.current_slug = next.clone();
        inner.playback = PlaybackState::default();

        match next {
            None => {
                inner.selection.last_request = None;
                None
            }
            Some(slug) => {
                let ticket = PlaybackTicket { slug, generation: inner.generation };
                inner.selection.last_request = Some(ticket.clone());
                inner.playback.loading = true;
                Some(ticket)
            }
        }
    }

    /// Applies a settled lookup. Returns `false` when the ticket was superseded
    /// and the result was discarded.
    pub async fn apply(&self, ticket: &PlaybackTicket, result: Result<ChannelStatus, FetchError>) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.generation != ticket.generation {
            warn!("Discarding stale playback result for '{}' (generation {} < {})",
                  ticket.slug, ticket.generation, inner.generation);
            return false;
        }

        match result {
            Ok(status) => {
                debug!("Playback data for '{}' applied", ticket.slug);
                inner.playback.data = Some(status);
                inner.playback.error = None;
            }
            Err(e) => {
                warn!("Playback lookup for '{}' failed: {}", ticket.slug, e);
                inner.playback.data = None;
                inner.playback.error = Some(e.to_string());
            }
        }
        inner.playback.loading = false;
        true
    }

    /// Performs the lookup for `ticket` and applies it if still current.
    pub async fn load(&self, ticket: PlaybackTicket) -> bool {
        let result = self.fetcher.fetch_playback(&ticket.slug).await;
        self.apply(&ticket, result).await
    }

    /// `sync` followed by `load` when a lookup is due.
    pub async fn select(&self, requested: Option<&str>, live_ranked: &[String]) {
        if let Some(ticket) = self.sync(requested, live_ranked).await {
            self.load(ticket).await;
        }
    }

    pub async fn selection(&self) -> SelectionState {
        self.inner.lock().await.selection.clone()
    }

    pub async fn playback(&self) -> PlaybackState {
        self.inner.lock().await.playback.clone()
    }

    /// Playback data merged with what the follow statuses already know, so the
    /// player is not blank while a lookup is pending or after it failed.
    pub async fn now_playing(&self, statuses: &StatusMapping) -> NowPlaying {
        let inner = self.inner.lock().await;
        let Some(slug) = inner.selection.current_slug.clone() else {
            return NowPlaying::default();
        };

        let playback = inner.playback.data.as_ref();
        let known = statuses.get(&slug).filter(|s| s.is_ok());

        NowPlaying {
            title: playback
                .and_then(|p| p.title.clone())
                .or_else(|| known.and_then(|s| s.title.clone()))
                .or_else(|| Some(slug.clone())),
            is_live: playback
                .map(|p| p.is_live)
                .or_else(|| known.map(|s| s.is_live))
                .unwrap_or(false),
            viewer_count: playback
                .and_then(|p| p.viewer_count)
                .or_else(|| known.and_then(|s| s.viewer_count)),
            category: playback
                .and_then(|p| p.category.clone())
                .or_else(|| known.and_then(|s| s.category.clone())),
            playback_url: playback.and_then(|p| p.playback_url.clone()),
            chat_url: Some(chat_url(&slug)),
            loading: inner.playback.loading,
            error: inner.playback.error.clone(),
            slug: Some(slug),
        }
    }

    /// Live channels for the sidebar; the current channel is pinned on top
    /// when it is live but not among the ranked ones.
    pub async fn sidebar(&self, live_ranked: &[String], statuses: &StatusMapping) -> Vec<String> {
        let inner = self.inner.lock().await;
        let Some(slug) = inner.selection.current_slug.clone() else {
            return live_ranked.to_vec();
        };
        if live_ranked.contains(&slug) {
            return live_ranked.to_vec();
        }

        let known_live = statuses.get(&slug).map(|s| s.is_ok() && s.is_live).unwrap_or(false);
        let playback_live = inner.playback.data.as_ref().map(|p| p.is_live).unwrap_or(false);
        if known_live || playback_live {
            std::iter::once(slug).chain(live_ranked.iter().cloned()).collect()
        } else {
            live_ranked.to_vec()
        }
    }
}
