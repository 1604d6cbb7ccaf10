// File: src/platforms/kick/mod.rs

pub mod client;
pub mod fallback;
pub mod normalizer;

pub use client::{chat_url, KickClient};
pub use fallback::{fallback_channel, WithFallback, FALLBACK_SLUGS};
pub use normalizer::normalize_channel;
