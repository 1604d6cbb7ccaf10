// File: kickwatch-core/src/services/reconcile_service.rs
//
// Keeps the follow list of the current identity and the latest status of
// every followed channel.
//
// A reconciliation pass lists the follows (or takes the list produced by an
// add/remove), fans out one lookup per slug, and replaces the whole status
// mapping once every lookup has settled. Per-slug failures become error
// records in the mapping. Only a failing follow store produces a pass-level
// error, and in that case the previous mapping stays in place.
//
// Passes may overlap (a refresh while an add is hydrating). Store writes and
// the re-list that follows them run one pass at a time, and the sequence number
// is taken at that point, so a higher number always carries the fresher list.
// A pass is dropped if the identity changed meanwhile or a newer pass already
// merged.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use futures_util::future::join_all;
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use kickwatch_common::error::Error;
use kickwatch_common::models::{ChannelStatus, IdentityContext, StatusMapping};
use kickwatch_common::traits::{ChannelFetcher, FollowStore};
use crate::follows::{normalize_slug, FollowBackends};
use crate::services::ranking;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Upper bound on simultaneous lookups per pass; `None` = all at once.
    pub max_concurrent_fetches: Option<usize>,
}

/// Consumer view of the follow state.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowSnapshot {
    pub identity: IdentityContext,
    pub follows: Vec<String>,
    pub statuses: StatusMapping,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Default)]
struct FollowState {
    identity: IdentityContext,
    identity_generation: u64,
    store: Option<Arc<dyn FollowStore>>,
    follows: Vec<String>,
    statuses: StatusMapping,
    passes_in_flight: usize,
    merged_pass: u64,
    error: Option<String>,
}

/// Identifies one pass from start to merge.
#[derive(Debug, Clone, Copy)]
struct PassTicket {
    generation: u64,
    pass: u64,
}

pub struct FollowReconciler {
    fetcher: Arc<dyn ChannelFetcher>,
    backends: FollowBackends,
    options: ReconcileOptions,
    state: RwLock<FollowState>,
    pass_counter: AtomicU64,
    store_order: Mutex<()>,
}

/// Store write applied before a pass re-lists the follows.
enum StoreWrite<'a> {
    Add(&'a str),
    Remove(&'a str),
}

impl FollowReconciler {
    pub fn new(
        fetcher: Arc<dyn ChannelFetcher>,
        backends: FollowBackends,
        options: ReconcileOptions,
    ) -> Self {
        Self {
            fetcher,
            backends,
            options,
            state: RwLock::new(FollowState::default()),
            pass_counter: AtomicU64::new(0),
            store_order: Mutex::new(()),
        }
    }

    pub fn fetcher(&self) -> Arc<dyn ChannelFetcher> {
        self.fetcher.clone()
    }

    /// Switches the session to `identity`.
    ///
    /// Any change drops the in-memory follows and statuses; a non-`None`
    /// identity then loads its follow list.
    pub async fn set_identity(&self, identity: IdentityContext) -> Result<(), Error> {
        {
            let mut st = self.state.write().await;
            if st.identity == identity {
                debug!("Identity unchanged ({}), nothing to reload", identity);
                return Ok(());
            }
            info!("Identity changed: {} -> {}", st.identity, identity);

            st.identity_generation += 1;
            st.identity = identity.clone();
            st.store = None;
            st.follows.clear();
            st.statuses.clear();
            st.error = None;

            match self.backends.store_for(&identity) {
                Ok(Some(store)) => st.store = Some(store),
                Ok(None) => return Ok(()),
                Err(e) => {
                    error!("No follow store for identity {}: {}", identity, e);
                    st.identity = IdentityContext::None;
                    st.error = Some(e.to_string());
                    return Err(e);
                }
            }
        }
        self.refresh().await
    }

    /// Re-lists the follows and refreshes every status. The only retry path
    /// for failed lookups.
    pub async fn refresh(&self) -> Result<(), Error> {
        let (generation, store) = self.begin_pass().await;
        let Some(store) = store else {
            self.end_pass().await;
            return Ok(());
        };
        self.run_pass(generation, store, None).await
    }

    /// Follows `input` (trimmed, lowercased). Blank input is ignored.
    pub async fn add_follow(&self, input: &str) -> Result<(), Error> {
        let slug = normalize_slug(input);
        if slug.is_empty() {
            debug!("Ignoring blank follow request");
            return Ok(());
        }

        let (generation, store) = self.begin_pass().await;
        let store = match store {
            Some(store) => store,
            None => return self.no_identity(generation).await,
        };
        self.run_pass(generation, store, Some(StoreWrite::Add(&slug))).await
    }

    pub async fn remove_follow(&self, input: &str) -> Result<(), Error> {
        let slug = normalize_slug(input);
        if slug.is_empty() {
            return Ok(());
        }

        let (generation, store) = self.begin_pass().await;
        let store = match store {
            Some(store) => store,
            None => return self.no_identity(generation).await,
        };
        self.run_pass(generation, store, Some(StoreWrite::Remove(&slug))).await
    }

    pub async fn snapshot(&self) -> FollowSnapshot {
        let st = self.state.read().await;
        FollowSnapshot {
            identity: st.identity.clone(),
            follows: st.follows.clone(),
            statuses: st.statuses.clone(),
            loading: st.passes_in_flight > 0,
            error: st.error.clone(),
        }
    }

    pub async fn identity(&self) -> IdentityContext {
        self.state.read().await.identity.clone()
    }

    pub async fn statuses(&self) -> StatusMapping {
        self.state.read().await.statuses.clone()
    }

    /// Follows in display order.
    pub async fn ranked(&self) -> Vec<String> {
        let st = self.state.read().await;
        ranking::rank_follows(&st.follows, &st.statuses)
    }

    /// Live follows in display order; the selector picks from these.
    pub async fn live_ranked(&self) -> Vec<String> {
        let st = self.state.read().await;
        ranking::live_ranked(&st.follows, &st.statuses)
    }

    async fn begin_pass(&self) -> (u64, Option<Arc<dyn FollowStore>>) {
        let mut st = self.state.write().await;
        st.passes_in_flight += 1;
        st.error = None;
        (st.identity_generation, st.store.clone())
    }

    /// Applies `write`, re-lists the follows, then hydrates and merges them.
    async fn run_pass(
        &self,
        generation: u64,
        store: Arc<dyn FollowStore>,
        write: Option<StoreWrite<'_>>,
    ) -> Result<(), Error> {
        let listed = {
            let _order = self.store_order.lock().await;
            self.write_and_list(store.as_ref(), write)
                .await
                .map(|follows| {
                    let pass = self.pass_counter.fetch_add(1, Ordering::SeqCst) + 1;
                    (PassTicket { generation, pass }, follows)
                })
        };
        let (ticket, follows) = match listed {
            Ok(listed) => listed,
            Err(e) => {
                self.fail_pass(generation, &e).await;
                return Err(e);
            }
        };

        let statuses = self.hydrate(&follows).await;
        self.merge(ticket, follows, statuses).await;
        Ok(())
    }

    async fn write_and_list(
        &self,
        store: &dyn FollowStore,
        write: Option<StoreWrite<'_>>,
    ) -> Result<Vec<String>, Error> {
        match write {
            Some(StoreWrite::Add(slug)) => {
                store.add(slug).await?;
                let follows = store.list().await?;
                info!("Followed '{}' ({} follow(s))", slug, follows.len());
                Ok(follows)
            }
            Some(StoreWrite::Remove(slug)) => {
                store.remove(slug).await?;
                let follows = store.list().await?;
                info!("Unfollowed '{}' ({} follow(s))", slug, follows.len());
                Ok(follows)
            }
            None => store.list().await,
        }
    }

    async fn end_pass(&self) {
        let mut st = self.state.write().await;
        st.passes_in_flight = st.passes_in_flight.saturating_sub(1);
    }

    async fn fail_pass(&self, generation: u64, e: &Error) {
        error!("Follow store failure, keeping previous statuses: {}", e);
        let mut st = self.state.write().await;
        st.passes_in_flight = st.passes_in_flight.saturating_sub(1);
        if st.identity_generation == generation {
            st.error = Some(e.to_string());
        }
    }

    async fn no_identity(&self, generation: u64) -> Result<(), Error> {
        let e = Error::Store("no active identity; start a guest session or sign in".to_string());
        self.fail_pass(generation, &e).await;
        Err(e)
    }

    async fn fetch_one(&self, slug: String) -> (String, ChannelStatus) {
        let status = match self.fetcher.fetch_channel(&slug).await {
            Ok(status) => status,
            Err(e) => {
                warn!("Status lookup for '{}' failed: {}", slug, e);
                ChannelStatus::failed(&slug, e.to_string())
            }
        };
        (slug, status)
    }

    /// One lookup per slug, concurrently; failures stay local to their slug.
    async fn hydrate(&self, follows: &[String]) -> StatusMapping {
        if follows.is_empty() {
            return StatusMapping::new();
        }
        let lookups = follows.iter().cloned().map(|slug| self.fetch_one(slug));
        let entries: Vec<(String, ChannelStatus)> = match self.options.max_concurrent_fetches {
            None => join_all(lookups).await,
            Some(limit) => stream::iter(lookups).buffer_unordered(limit.max(1)).collect().await,
        };
        entries.into_iter().collect()
    }

    async fn merge(&self, ticket: PassTicket, follows: Vec<String>, statuses: StatusMapping) {
        let mut st = self.state.write().await;
        st.passes_in_flight = st.passes_in_flight.saturating_sub(1);

        if st.identity_generation != ticket.generation {
            debug!("Dropping pass {} started under a previous identity", ticket.pass);
            return;
        }
        if ticket.pass < st.merged_pass {
            debug!("Dropping pass {}; pass {} already merged", ticket.pass, st.merged_pass);
            return;
        }

        let live = statuses.values().filter(|s| s.is_ok() && s.is_live).count();
        let failed = statuses.values().filter(|s| !s.is_ok()).count();
        info!("Reconciled {} follow(s): {} live, {} failed", follows.len(), live, failed);

        st.merged_pass = ticket.pass;
        st.follows = follows;
        st.statuses = statuses;
    }
}
