// src/repositories/postgres/mod.rs

pub mod follows;

pub use follows::PostgresFollowRepository;
