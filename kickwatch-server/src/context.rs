//! kickwatch-server/src/context.rs
//!
//! Everything the HTTP handlers share, built once at start-up.

use std::sync::Arc;
use tracing::info;

use kickwatch_common::models::IdentityContext;
use kickwatch_common::traits::{ChannelFetcher, FollowDocumentRepository};
use kickwatch_core::follows::FollowBackends;
use kickwatch_core::platforms::kick::{KickClient, WithFallback};
use kickwatch_core::repositories::{FileCookieJar, PostgresFollowRepository};
use kickwatch_core::services::{ActiveChannelSelector, FollowReconciler, ReconcileOptions};
use kickwatch_core::{Database, DefaultHttpClient, Error, KickwatchConfig};

/// The session served by this process: one follow list, one player.
pub struct ServerContext {
    pub config: KickwatchConfig,
    pub fetcher: Arc<dyn ChannelFetcher>,
    pub reconciler: Arc<FollowReconciler>,
    pub selector: Arc<ActiveChannelSelector>,
    /// Present when DATABASE_URL is configured.
    pub db: Option<Database>,
}

impl ServerContext {
    pub async fn new(config: KickwatchConfig) -> Result<Self, Error> {
        let fetcher = build_fetcher(&config)?;

        let (db, documents) = match config.database_url.as_deref() {
            Some(url) => {
                let db = Database::new(url).await?;
                db.migrate().await?;
                let repo: Arc<dyn FollowDocumentRepository> =
                    Arc::new(PostgresFollowRepository::new(db.pool().clone()));
                (Some(db), Some(repo))
            }
            None => {
                info!("DATABASE_URL not set; signed-in follows are unavailable");
                (None, None)
            }
        };

        info!("Guest follows are kept in {}", config.cookie_path.display());
        let cookies = Arc::new(FileCookieJar::new(&config.cookie_path));
        let backends = FollowBackends::new(documents, cookies);

        let mut ctx = Self::from_parts(config, fetcher, backends);
        ctx.db = db;
        Ok(ctx)
    }

    pub fn from_parts(
        config: KickwatchConfig,
        fetcher: Arc<dyn ChannelFetcher>,
        backends: FollowBackends,
    ) -> Self {
        let options = ReconcileOptions {
            max_concurrent_fetches: config.max_concurrent_fetches,
        };
        let reconciler = Arc::new(FollowReconciler::new(fetcher.clone(), backends, options));
        let selector = Arc::new(ActiveChannelSelector::new(fetcher.clone()));
        Self {
            config,
            fetcher,
            reconciler,
            selector,
            db: None,
        }
    }

    /// Opens the session for `identity`, loading its follows.
    pub async fn start_session(&self, identity: IdentityContext) -> Result<(), Error> {
        self.reconciler.set_identity(identity).await?;
        let live = self.reconciler.live_ranked().await;
        self.selector.select(None, &live).await;
        Ok(())
    }
}

/// Kick client over reqwest, wrapped with the bundled fallback records.
pub fn build_fetcher(config: &KickwatchConfig) -> Result<Arc<dyn ChannelFetcher>, Error> {
    let http = DefaultHttpClient::with_timeout(config.request_timeout)?;
    let kick = KickClient::new(http, &config.kick_base_url);
    info!("Kick API at {} (fallback records {})",
          kick.base_url(), if config.use_fallback { "on" } else { "off" });
    Ok(Arc::new(WithFallback::new(kick, config.use_fallback)))
}
