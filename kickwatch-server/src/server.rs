//! kickwatch-server/src/server.rs
//!
//! JSON API over the session context, plus the built front-end when present.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderValue, Method, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use axum_server::{Handle, Server};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use kickwatch_common::models::{ChannelStatus, IdentityContext};
use kickwatch_common::traits::ChannelFetcher;
use kickwatch_core::follows::normalize_slug;
use kickwatch_core::services::{live_ranked, rank_follows, FollowSnapshot, NowPlaying};
use kickwatch_core::{Error, FetchError};

use crate::context::ServerContext;

type AppState = State<Arc<ServerContext>>;

pub enum ApiError {
    BadRequest(String),
    NoSession,
    Fetch(FetchError),
    Internal(Error),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::Validation(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other),
        }
    }
}

impl From<FetchError> for ApiError {
    fn from(e: FetchError) -> Self {
        ApiError::Fetch(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NoSession => (
                StatusCode::UNAUTHORIZED,
                "no active session; start a guest session or sign in".to_string(),
            ),
            ApiError::Fetch(e) => {
                let status = match e {
                    FetchError::Http { status: 404, .. } => StatusCode::NOT_FOUND,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (status, e.to_string())
            }
            ApiError::Internal(e @ Error::Store(_)) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
            ApiError::Internal(e) => {
                error!("Request failed: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Follow state as the client renders it.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowsView {
    #[serde(flatten)]
    pub snapshot: FollowSnapshot,
    pub ranked: Vec<String>,
    pub live_ranked: Vec<String>,
}

impl From<FollowSnapshot> for FollowsView {
    fn from(snapshot: FollowSnapshot) -> Self {
        let ranked = rank_follows(&snapshot.follows, &snapshot.statuses);
        let live_ranked = live_ranked(&snapshot.follows, &snapshot.statuses);
        Self { snapshot, ranked, live_ranked }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub now_playing: NowPlaying,
    /// Live channels in display order, current one pinned when needed.
    pub sidebar: Vec<String>,
}

#[derive(Deserialize)]
pub struct FollowBody {
    slug: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSessionBody {
    user_id: String,
}

#[derive(Deserialize)]
pub struct PlayerQuery {
    slug: Option<String>,
}

pub fn router(ctx: Arc<ServerContext>) -> Result<Router, Error> {
    let cors = cors_layer(&ctx.config.allowed_origin)?;
    let dist = ctx.config.dist_dir.clone();

    let mut app = Router::new()
        .route("/api/health", get(health))
        .route("/api/channels/{slug}", get(channel))
        .route("/api/follows", get(list_follows).post(add_follow))
        .route("/api/follows/refresh", post(refresh_follows))
        .route("/api/follows/{slug}", delete(remove_follow))
        .route("/api/player", get(player))
        .route("/api/session", delete(end_session))
        .route("/api/session/guest", post(guest_session))
        .route("/api/session/user", post(user_session));

    if dist.is_dir() {
        info!("Serving front-end from {}", dist.display());
        let index = ServeFile::new(dist.join("index.html"));
        app = app.fallback_service(ServeDir::new(&dist).not_found_service(index));
    }

    Ok(app
        .with_state(ctx)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors)))
}

fn cors_layer(origin: &str) -> Result<CorsLayer, Error> {
    let value = HeaderValue::from_str(origin)
        .map_err(|e| Error::Config(format!("ALLOWED_ORIGIN '{}' is not usable: {}", origin, e)))?;
    Ok(CorsLayer::new()
        .allow_origin(value)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]))
}

/// Binds on all interfaces and serves until Ctrl-C.
pub async fn serve(ctx: Arc<ServerContext>) -> Result<(), Error> {
    let addr = SocketAddr::from(([0, 0, 0, 0], ctx.config.port));
    let app = router(ctx)?;

    let handle = Handle::new();
    let handle_clone = handle.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {:?}", e);
        }
        info!("Ctrl-C detected; shutting down HTTP server...");
        handle_clone.graceful_shutdown(Some(Duration::from_secs(5)));
    });

    info!("Server listening on http://localhost:{}", addr.port());
    Server::bind(addr)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;
    info!("HTTP server shut down.");
    Ok(())
}

async fn health(State(ctx): AppState) -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "kickBase": ctx.config.kick_base_url }))
}

async fn channel(State(ctx): AppState, Path(slug): Path<String>) -> Result<Json<ChannelStatus>, ApiError> {
    let slug = normalize_slug(&slug);
    if slug.is_empty() {
        return Err(ApiError::BadRequest("slug is required".to_string()));
    }
    Ok(Json(ctx.fetcher.fetch_channel(&slug).await?))
}

async fn require_session(ctx: &ServerContext) -> Result<(), ApiError> {
    if ctx.reconciler.identity().await.is_none() {
        return Err(ApiError::NoSession);
    }
    Ok(())
}

async fn follows_view(ctx: &ServerContext) -> Json<FollowsView> {
    Json(ctx.reconciler.snapshot().await.into())
}

async fn list_follows(State(ctx): AppState) -> Json<FollowsView> {
    follows_view(&ctx).await
}

async fn add_follow(State(ctx): AppState, Json(body): Json<FollowBody>) -> Result<Json<FollowsView>, ApiError> {
    require_session(&ctx).await?;
    ctx.reconciler.add_follow(&body.slug).await?;
    Ok(follows_view(&ctx).await)
}

async fn remove_follow(State(ctx): AppState, Path(slug): Path<String>) -> Result<Json<FollowsView>, ApiError> {
    require_session(&ctx).await?;
    ctx.reconciler.remove_follow(&slug).await?;
    Ok(follows_view(&ctx).await)
}

async fn refresh_follows(State(ctx): AppState) -> Result<Json<FollowsView>, ApiError> {
    ctx.reconciler.refresh().await?;
    Ok(follows_view(&ctx).await)
}

async fn player(State(ctx): AppState, Query(query): Query<PlayerQuery>) -> Json<PlayerView> {
    let live = ctx.reconciler.live_ranked().await;
    ctx.selector.select(query.slug.as_deref(), &live).await;

    let statuses = ctx.reconciler.statuses().await;
    Json(PlayerView {
        now_playing: ctx.selector.now_playing(&statuses).await,
        sidebar: ctx.selector.sidebar(&live, &statuses).await,
    })
}

async fn guest_session(State(ctx): AppState) -> Result<Json<FollowsView>, ApiError> {
    ctx.start_session(IdentityContext::Anonymous).await?;
    Ok(follows_view(&ctx).await)
}

async fn user_session(State(ctx): AppState, Json(body): Json<UserSessionBody>) -> Result<Json<FollowsView>, ApiError> {
    let user_id = body.user_id.trim();
    if user_id.is_empty() {
        return Err(ApiError::BadRequest("userId is required".to_string()));
    }
    ctx.start_session(IdentityContext::Authenticated { user_id: user_id.to_string() }).await?;
    Ok(follows_view(&ctx).await)
}

async fn end_session(State(ctx): AppState) -> Result<Json<FollowsView>, ApiError> {
    ctx.start_session(IdentityContext::None).await?;
    Ok(follows_view(&ctx).await)
}
