// src/repositories/cookie/mod.rs

pub mod jar;

pub use jar::{FileCookieJar, MemoryCookieJar};
