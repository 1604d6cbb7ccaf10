use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use anyhow::Context;
use clap::Parser;
use futures_util::future::join_all;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use kickwatch_common::models::{ChannelStatus, IdentityContext};
use kickwatch_common::traits::ChannelFetcher;
use kickwatch_core::follows::normalize_slug;
use kickwatch_core::KickwatchConfig;

mod context;
mod server;

use context::{build_fetcher, ServerContext};

#[derive(Parser, Debug, Clone)]
#[command(name = "kickwatch")]
#[command(author, version, about = "Kickwatch - follow Kick channels and watch whoever is live")]
struct Args {
    /// Mode: "server" or "status"
    #[arg(long, default_value = "server")]
    mode: String,

    /// Channels to look up in status mode (repeatable)
    #[arg(long = "slug")]
    slugs: Vec<String>,

    /// Overrides PORT
    #[arg(long)]
    port: Option<u16>,

    /// Overrides DATABASE_URL
    #[arg(long)]
    database_url: Option<String>,

    /// Overrides KICKWATCH_COOKIE_PATH
    #[arg(long)]
    cookie_path: Option<PathBuf>,

    /// Never substitute the bundled fallback records
    #[arg(long)]
    no_fallback: bool,

    /// Open a guest session at start-up
    #[arg(long)]
    guest: bool,

    /// Open a session for this user id at start-up
    #[arg(long)]
    user: Option<String>,
}

impl Args {
    fn apply(&self, config: &mut KickwatchConfig) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(url) = self.database_url.as_ref() {
            config.database_url = Some(url.clone());
        }
        if let Some(path) = self.cookie_path.as_ref() {
            config.cookie_path = path.clone();
        }
        if self.no_fallback {
            config.use_fallback = false;
        }
    }

    fn initial_identity(&self) -> IdentityContext {
        match self.user.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            Some(user_id) => IdentityContext::Authenticated { user_id: user_id.to_string() },
            None if self.guest => IdentityContext::Anonymous,
            None => IdentityContext::None,
        }
    }
}

fn init_tracing() {
    tracing_log::LogTracer::init().ok();
    let filter = EnvFilter::from_default_env()
        .add_directive("kickwatch=info".parse().unwrap_or_default())
        .add_directive("kickwatch_core=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub)
        .expect("Failed to set global subscriber");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    info!("Kickwatch starting. mode={}", args.mode);

    let mut config = KickwatchConfig::from_env().context("reading configuration")?;
    args.apply(&mut config);

    match args.mode.as_str() {
        "server" => run_server(args, config).await?,
        "status" => run_status(args, config).await?,
        other => {
            error!("Invalid mode '{}'. Use --mode=server or --mode=status.", other);
            anyhow::bail!("invalid mode '{}'", other);
        }
    }
    info!("Main finished. Goodbye!");
    Ok(())
}

async fn run_server(args: Args, config: KickwatchConfig) -> anyhow::Result<()> {
    let ctx = ServerContext::new(config)
        .await
        .context("building server context")?;

    let identity = args.initial_identity();
    if !identity.is_none() {
        info!("Opening start-up session for {}", identity);
        if let Err(e) = ctx.start_session(identity).await {
            error!("Start-up session failed: {}", e);
        }
    }

    server::serve(Arc::new(ctx)).await.context("HTTP server")?;
    Ok(())
}

/// One lookup per slug, printed as a slug -> status JSON object.
async fn run_status(args: Args, config: KickwatchConfig) -> anyhow::Result<()> {
    let slugs: Vec<String> = args
        .slugs
        .iter()
        .map(|s| normalize_slug(s))
        .filter(|s| !s.is_empty())
        .collect();
    if slugs.is_empty() {
        anyhow::bail!("status mode needs at least one --slug");
    }

    let fetcher = build_fetcher(&config)?;
    let lookups = slugs.iter().map(|slug| {
        let fetcher = fetcher.clone();
        async move {
            let status = fetcher
                .fetch_channel(slug)
                .await
                .unwrap_or_else(|e| ChannelStatus::failed(slug, e.to_string()));
            (slug.clone(), status)
        }
    });
    let statuses: BTreeMap<String, ChannelStatus> = join_all(lookups).await.into_iter().collect();

    println!("{}", serde_json::to_string_pretty(&statuses)?);
    Ok(())
}
