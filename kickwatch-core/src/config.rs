// File: kickwatch-core/src/config.rs
//
// Runtime settings. Values come from the process environment (optionally
// seeded from a `.env` file); the server binary overrides some of them with
// command-line flags.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;
use crate::Error;

pub const DEFAULT_KICK_BASE_URL: &str = "https://kick.com/api/v1/channels";
pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:4000";
pub const DEFAULT_COOKIE_PATH: &str = "kickwatch-cookies.json";
pub const DEFAULT_DIST_DIR: &str = "client/dist";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq)]
pub struct KickwatchConfig {
    pub kick_base_url: String,
    /// Substitute bundled records for the well-known demo channels on lookup failure.
    pub use_fallback: bool,
    pub request_timeout: Duration,
    /// `None` fans out to every followed slug at once.
    pub max_concurrent_fetches: Option<usize>,
    pub port: u16,
    pub allowed_origin: String,
    /// Enables the authenticated follow store when set.
    pub database_url: Option<String>,
    pub cookie_path: PathBuf,
    pub dist_dir: PathBuf,
}

impl Default for KickwatchConfig {
    fn default() -> Self {
        Self {
            kick_base_url: DEFAULT_KICK_BASE_URL.to_string(),
            use_fallback: true,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_concurrent_fetches: None,
            port: DEFAULT_PORT,
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
            database_url: None,
            cookie_path: PathBuf::from(DEFAULT_COOKIE_PATH),
            dist_dir: PathBuf::from(DEFAULT_DIST_DIR),
        }
    }
}

impl KickwatchConfig {
    /// Loads `.env` if present, then reads the environment.
    pub fn from_env() -> Result<Self, Error> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("KICK_BASE_URL") {
            cfg.kick_base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = get("KICK_USE_FALLBACK") {
            cfg.use_fallback = parse_flag("KICK_USE_FALLBACK", &v)?;
        }
        if let Some(v) = get("KICK_REQUEST_TIMEOUT_SECS") {
            cfg.request_timeout = Duration::from_secs(parse_num("KICK_REQUEST_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = get("KICK_MAX_CONCURRENT_FETCHES") {
            let n: usize = parse_num("KICK_MAX_CONCURRENT_FETCHES", &v)?;
            cfg.max_concurrent_fetches = (n > 0).then_some(n);
        }
        if let Some(v) = get("PORT") {
            cfg.port = parse_num("PORT", &v)?;
        }
        if let Some(v) = get("ALLOWED_ORIGIN") {
            cfg.allowed_origin = v;
        }
        cfg.database_url = get("DATABASE_URL");
        if let Some(v) = get("KICKWATCH_COOKIE_PATH") {
            cfg.cookie_path = PathBuf::from(v);
        }
        if let Some(v) = get("KICKWATCH_DIST_DIR") {
            cfg.dist_dir = PathBuf::from(v);
        }

        debug!("Loaded config: base_url={}, fallback={}, port={}",
               cfg.kick_base_url, cfg.use_fallback, cfg.port);
        Ok(cfg)
    }
}

fn parse_num<T: FromStr>(key: &str, value: &str) -> Result<T, Error> {
    value
        .parse::<T>()
        .map_err(|_| Error::Config(format!("{} must be a non-negative integer, got '{}'", key, value)))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, Error> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!("{} must be a boolean, got '{}'", key, other))),
    }
}
