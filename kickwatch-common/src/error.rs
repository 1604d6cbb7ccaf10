// ================================================================
// File: kickwatch-common/src/error.rs
// ================================================================

use thiserror::Error;

/// Why a single channel lookup failed.
///
/// These are per-slug and recoverable: the reconciliation engine records them
/// in the status mapping instead of failing the whole pass.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Kick HTTP {status}: {body_excerpt}")]
    Http { status: u16, body_excerpt: String },

    #[error("Kick response is not JSON (content-type: {content_type})")]
    UnexpectedContentType { content_type: String },

    #[error("Kick response could not be parsed: {0}")]
    Parse(String),

    /// The request never produced a response (DNS, refused connection, timeout).
    #[error("Kick request failed: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found error: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Follow store error: {0}")]
    Store(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Address parse error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Parse(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Parse(s.to_string())
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Parse(e.to_string())
    }
}
