// File: kickwatch-core/tests/reconcile_tests.rs

mod test_utils;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use chrono::Duration;

use kickwatch_common::models::{ChannelStatus, IdentityContext, StatusMapping};
use kickwatch_common::traits::{CookieJar, FollowDocumentRepository};
use kickwatch_core::follows::{FollowBackends, GUEST_COOKIE_NAME};
use kickwatch_core::repositories::MemoryCookieJar;
use kickwatch_core::services::{rank_follows, FollowReconciler, ReconcileOptions};
use kickwatch_core::Error;
use test_utils::{live, offline, slugs, InMemoryDocumentRepo, StubFetcher};

fn demo_fetcher() -> StubFetcher {
    StubFetcher::new()
        .with("eray", Ok(offline("eray")))
        .with("ebonivon", Ok(live("ebonivon", 412)))
        .with("xqc", Ok(live("xqc", 9000)))
}

struct Harness {
    fetcher: Arc<StubFetcher>,
    jar: Arc<MemoryCookieJar>,
    docs: Arc<InMemoryDocumentRepo>,
    reconciler: FollowReconciler,
}

fn harness_with(fetcher: StubFetcher, options: ReconcileOptions) -> Harness {
    let fetcher = Arc::new(fetcher);
    let jar = Arc::new(MemoryCookieJar::new());
    let docs = Arc::new(InMemoryDocumentRepo::default());
    let documents: Arc<dyn FollowDocumentRepository> = docs.clone();
    let backends = FollowBackends::new(Some(documents), jar.clone());
    let reconciler = FollowReconciler::new(fetcher.clone(), backends, options);
    Harness { fetcher, jar, docs, reconciler }
}

fn harness() -> Harness {
    harness_with(demo_fetcher(), ReconcileOptions::default())
}

async fn seed_guest_cookie(jar: &MemoryCookieJar, follows: &str) {
    jar.set(GUEST_COOKIE_NAME, follows, Duration::days(30))
        .await
        .expect("memory jar never fails");
}

fn user(id: &str) -> IdentityContext {
    IdentityContext::Authenticated { user_id: id.to_string() }
}

#[tokio::test]
async fn test_guest_session_ranks_live_first() -> Result<(), Error> {
    let h = harness();
    seed_guest_cookie(&h.jar, r#"["eray","ebonivon"]"#).await;

    h.reconciler.set_identity(IdentityContext::Anonymous).await?;

    let snap = h.reconciler.snapshot().await;
    assert_eq!(snap.identity, IdentityContext::Anonymous);
    assert_eq!(snap.follows, slugs(&["eray", "ebonivon"]));
    assert!(!snap.loading);
    assert!(snap.error.is_none());
    assert!(snap.statuses["ebonivon"].is_live);
    assert_eq!(snap.statuses["ebonivon"].viewer_count, Some(412));
    assert!(!snap.statuses["eray"].is_live);

    assert_eq!(h.reconciler.ranked().await, slugs(&["ebonivon", "eray"]));
    assert_eq!(h.reconciler.live_ranked().await, slugs(&["ebonivon"]));
    Ok(())
}

#[tokio::test]
async fn test_failed_lookup_stays_local_to_its_slug() -> Result<(), Error> {
    let h = harness();
    seed_guest_cookie(&h.jar, r#"["ghost","eray","ebonivon"]"#).await;

    h.reconciler.set_identity(IdentityContext::Anonymous).await?;

    let snap = h.reconciler.snapshot().await;
    assert!(snap.error.is_none());
    assert_eq!(snap.statuses.len(), 3);

    let ghost = &snap.statuses["ghost"];
    assert_eq!(ghost.error.as_deref(), Some("Kick HTTP 404: Not Found"));
    assert!(!ghost.is_live);
    assert!(snap.statuses["eray"].is_ok());
    assert!(snap.statuses["ebonivon"].is_ok());

    // Unknown viewer count ranks below an offline channel's zero.
    assert_eq!(h.reconciler.ranked().await, slugs(&["ebonivon", "eray", "ghost"]));
    Ok(())
}

#[tokio::test]
async fn test_store_failure_keeps_previous_statuses() -> Result<(), Error> {
    let h = harness();
    h.docs.upsert_follow("u1", &kickwatch_common::models::FollowRecord::new("ebonivon")).await?;
    h.reconciler.set_identity(user("u1")).await?;
    let before = h.reconciler.statuses().await;
    assert_eq!(before.len(), 1);

    h.docs.fail.store(true, Ordering::SeqCst);
    let result = h.reconciler.refresh().await;
    assert!(matches!(result, Err(Error::Store(_))));

    let snap = h.reconciler.snapshot().await;
    assert_eq!(snap.statuses, before);
    assert_eq!(snap.follows, slugs(&["ebonivon"]));
    assert!(snap.error.as_deref().unwrap_or_default().contains("document store unavailable"));
    assert!(!snap.loading);

    // The next successful pass clears the error.
    h.docs.fail.store(false, Ordering::SeqCst);
    h.reconciler.refresh().await?;
    assert!(h.reconciler.snapshot().await.error.is_none());
    Ok(())
}

#[tokio::test]
async fn test_switching_to_no_identity_clears_everything() -> Result<(), Error> {
    let h = harness();
    seed_guest_cookie(&h.jar, r#"["eray"]"#).await;
    h.reconciler.set_identity(IdentityContext::Anonymous).await?;
    assert_eq!(h.reconciler.snapshot().await.follows.len(), 1);

    h.reconciler.set_identity(IdentityContext::None).await?;

    let snap = h.reconciler.snapshot().await;
    assert_eq!(snap.identity, IdentityContext::None);
    assert!(snap.follows.is_empty());
    assert!(snap.statuses.is_empty());
    assert!(h.reconciler.live_ranked().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_unchanged_identity_does_not_reload() -> Result<(), Error> {
    let h = harness();
    seed_guest_cookie(&h.jar, r#"["eray","ebonivon"]"#).await;
    h.reconciler.set_identity(IdentityContext::Anonymous).await?;
    let calls = h.fetcher.call_count();

    h.reconciler.set_identity(IdentityContext::Anonymous).await?;
    assert_eq!(h.fetcher.call_count(), calls);
    Ok(())
}

#[tokio::test]
async fn test_identity_switch_loads_the_other_store() -> Result<(), Error> {
    let h = harness();
    seed_guest_cookie(&h.jar, r#"["eray"]"#).await;
    h.docs.upsert_follow("u1", &kickwatch_common::models::FollowRecord::new("xqc")).await?;

    h.reconciler.set_identity(IdentityContext::Anonymous).await?;
    assert_eq!(h.reconciler.snapshot().await.follows, slugs(&["eray"]));

    h.reconciler.set_identity(user("u1")).await?;
    let snap = h.reconciler.snapshot().await;
    assert_eq!(snap.follows, slugs(&["xqc"]));
    assert!(!snap.statuses.contains_key("eray"));
    Ok(())
}

#[tokio::test]
async fn test_add_twice_yields_one_entry() -> Result<(), Error> {
    let h = harness();
    h.reconciler.set_identity(IdentityContext::Anonymous).await?;

    h.reconciler.add_follow("Eray").await?;
    h.reconciler.add_follow(" eray ").await?;

    let snap = h.reconciler.snapshot().await;
    assert_eq!(snap.follows, slugs(&["eray"]));
    assert_eq!(snap.statuses.len(), 1);
    assert!(snap.statuses["eray"].is_ok());
    Ok(())
}

#[tokio::test]
async fn test_add_then_remove_restores_state() -> Result<(), Error> {
    let h = harness();
    h.docs.upsert_follow("u1", &kickwatch_common::models::FollowRecord::new("eray")).await?;
    h.reconciler.set_identity(user("u1")).await?;
    let before = h.reconciler.snapshot().await;

    h.reconciler.add_follow("ebonivon").await?;
    assert_eq!(h.reconciler.snapshot().await.follows, slugs(&["eray", "ebonivon"]));
    assert_eq!(h.reconciler.live_ranked().await, slugs(&["ebonivon"]));

    h.reconciler.remove_follow("EBONIVON").await?;
    let after = h.reconciler.snapshot().await;
    assert_eq!(after.follows, before.follows);
    assert_eq!(after.statuses, before.statuses);
    assert_eq!(h.docs.list_follow_ids("u1").await?, slugs(&["eray"]));
    Ok(())
}

#[tokio::test]
async fn test_blank_add_is_ignored() -> Result<(), Error> {
    let h = harness();
    h.reconciler.set_identity(IdentityContext::Anonymous).await?;
    h.reconciler.add_follow("   ").await?;
    assert!(h.reconciler.snapshot().await.follows.is_empty());
    assert_eq!(h.fetcher.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_add_without_identity_is_an_error() {
    let h = harness();
    let result = h.reconciler.add_follow("eray").await;
    assert!(matches!(result, Err(Error::Store(_))));

    let snap = h.reconciler.snapshot().await;
    assert!(snap.follows.is_empty());
    assert!(snap.error.is_some());
    assert!(!snap.loading);
    assert_eq!(h.fetcher.call_count(), 0);
}

#[tokio::test]
async fn test_refresh_without_identity_is_a_noop() -> Result<(), Error> {
    let h = harness();
    h.reconciler.refresh().await?;
    let snap = h.reconciler.snapshot().await;
    assert!(snap.statuses.is_empty());
    assert!(!snap.loading);
    Ok(())
}

#[tokio::test]
async fn test_refresh_retries_failed_lookups() -> Result<(), Error> {
    let h = harness();
    seed_guest_cookie(&h.jar, r#"["newcomer"]"#).await;
    h.reconciler.set_identity(IdentityContext::Anonymous).await?;
    assert!(!h.reconciler.statuses().await["newcomer"].is_ok());

    h.fetcher.set("newcomer", Ok(live("newcomer", 3)));
    h.reconciler.refresh().await?;
    let statuses = h.reconciler.statuses().await;
    assert!(statuses["newcomer"].is_ok());
    assert!(statuses["newcomer"].is_live);
    Ok(())
}

#[tokio::test]
async fn test_bounded_concurrency_gives_same_result() -> Result<(), Error> {
    let unbounded = harness();
    let bounded = harness_with(
        demo_fetcher(),
        ReconcileOptions { max_concurrent_fetches: Some(1) },
    );
    for h in [&unbounded, &bounded] {
        seed_guest_cookie(&h.jar, r#"["eray","ghost","xqc","ebonivon"]"#).await;
        h.reconciler.set_identity(IdentityContext::Anonymous).await?;
    }

    assert_eq!(unbounded.reconciler.statuses().await, bounded.reconciler.statuses().await);
    assert_eq!(unbounded.reconciler.ranked().await, slugs(&["xqc", "ebonivon", "eray", "ghost"]));
    assert_eq!(bounded.reconciler.ranked().await, unbounded.reconciler.ranked().await);
    Ok(())
}

#[tokio::test]
async fn test_pass_from_previous_identity_is_dropped() -> Result<(), Error> {
    let h = harness();
    seed_guest_cookie(&h.jar, r#"["ebonivon"]"#).await;
    h.docs.upsert_follow("u1", &kickwatch_common::models::FollowRecord::new("eray")).await?;
    h.reconciler.set_identity(IdentityContext::Anonymous).await?;

    h.fetcher.hold("ebonivon");
    let (slow, switch) = tokio::join!(h.reconciler.refresh(), async {
        h.fetcher.started.notified().await;
        let switched = h.reconciler.set_identity(user("u1")).await;
        h.fetcher.release("ebonivon");
        switched
    });
    slow?;
    switch?;

    let snap = h.reconciler.snapshot().await;
    assert_eq!(snap.identity, user("u1"));
    assert_eq!(snap.follows, slugs(&["eray"]));
    assert!(!snap.statuses.contains_key("ebonivon"));
    assert!(!snap.loading);
    Ok(())
}

#[tokio::test]
async fn test_slow_refresh_does_not_resurrect_removed_follow() -> Result<(), Error> {
    let h = harness();
    seed_guest_cookie(&h.jar, r#"["ebonivon"]"#).await;
    h.reconciler.set_identity(IdentityContext::Anonymous).await?;

    h.fetcher.hold("ebonivon");
    let (slow, removed) = tokio::join!(h.reconciler.refresh(), async {
        h.fetcher.started.notified().await;
        let removed = h.reconciler.remove_follow("ebonivon").await;
        assert!(h.reconciler.snapshot().await.loading);
        h.fetcher.release("ebonivon");
        removed
    });
    slow?;
    removed?;

    let snap = h.reconciler.snapshot().await;
    assert!(snap.follows.is_empty());
    assert!(snap.statuses.is_empty());
    assert!(!snap.loading);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_adds_keep_every_follow() -> Result<(), Error> {
    let h = harness();
    seed_guest_cookie(&h.jar, r#"["eray"]"#).await;
    h.reconciler.set_identity(IdentityContext::Anonymous).await?;

    // Both passes look up ebonivon; the first is still hydrating when the second lists.
    h.fetcher.hold("ebonivon");
    let (first, (second, ())) = tokio::join!(h.reconciler.add_follow("ebonivon"), async {
        h.fetcher.started.notified().await;
        tokio::join!(h.reconciler.add_follow("xqc"), async {
            h.fetcher.started.notified().await;
            h.fetcher.release("ebonivon");
            h.fetcher.release("ebonivon");
        })
    });
    first?;
    second?;

    let stored: Vec<String> = serde_json::from_str(
        &h.jar.get(GUEST_COOKIE_NAME).await?.unwrap_or_default(),
    )?;
    let snap = h.reconciler.snapshot().await;
    assert_eq!(stored, slugs(&["eray", "ebonivon", "xqc"]));
    assert_eq!(snap.follows, stored);
    for slug in &stored {
        assert!(snap.statuses.contains_key(slug), "missing status for {}", slug);
    }
    assert_eq!(h.reconciler.live_ranked().await, slugs(&["xqc", "ebonivon"]));
    assert!(!snap.loading);
    Ok(())
}

#[tokio::test]
async fn test_signed_in_without_document_store_leaves_no_identity() {
    let fetcher = Arc::new(demo_fetcher());
    let backends = FollowBackends::new(None, Arc::new(MemoryCookieJar::new()));
    let reconciler = FollowReconciler::new(fetcher.clone(), backends, ReconcileOptions::default());

    assert!(reconciler.set_identity(user("u1")).await.is_err());
    let snap = reconciler.snapshot().await;
    assert!(snap.identity.is_none());
    assert!(snap.error.is_some());
    assert!(!snap.loading);

    assert!(matches!(reconciler.add_follow("eray").await, Err(Error::Store(_))));
    assert_eq!(fetcher.call_count(), 0);
}

#[test]
fn test_ranking_is_independent_of_mapping_and_stable() {
    let mut statuses = StatusMapping::new();
    statuses.insert("a".to_string(), live("a", 10));
    statuses.insert("b".to_string(), live("b", 50));
    statuses.insert("c".to_string(), offline("c"));
    statuses.insert("d".to_string(), ChannelStatus::failed("d", "Kick HTTP 500: Unknown error"));

    let orders = [
        ["a", "b", "c", "d"],
        ["d", "c", "b", "a"],
        ["c", "a", "d", "b"],
        ["b", "d", "a", "c"],
    ];
    for order in orders.iter() {
        assert_eq!(rank_follows(&slugs(order), &statuses), slugs(&["b", "a", "c", "d"]));
    }

    // Equal keys keep follow order.
    let mut ties = StatusMapping::new();
    ties.insert("x".to_string(), live("x", 5));
    ties.insert("y".to_string(), live("y", 5));
    assert_eq!(rank_follows(&slugs(&["y", "x"]), &ties), slugs(&["y", "x"]));
    assert_eq!(rank_follows(&slugs(&["x", "y"]), &ties), slugs(&["x", "y"]));
}
