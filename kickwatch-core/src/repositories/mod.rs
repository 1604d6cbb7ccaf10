// src/repositories/mod.rs

pub mod cookie;
pub mod postgres;

pub use cookie::{FileCookieJar, MemoryCookieJar};
pub use postgres::follows::PostgresFollowRepository;
