// src/lib.rs

pub mod config;
pub mod db;
pub mod follows;
pub mod http;
pub mod platforms;
pub mod repositories;
pub mod services;

pub use config::KickwatchConfig;
pub use db::Database;
pub use kickwatch_common::error::{Error, FetchError};
pub use http::{DefaultHttpClient, HttpClient, HttpResponse};
