// kickwatch-core/src/db/mod.rs
//
// Postgres connection for signed-in follow lists. Only built when
// DATABASE_URL is configured; guest sessions never touch it.

use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use tracing::info;
use crate::Error;

const MAX_CONNECTIONS: u32 = 5;

#[derive(Clone)]
pub struct Database {
    pool: Pool<Postgres>,
}

impl Database {
    /// Connects to the follow-document database at `database_url`.
    pub async fn new(database_url: &str) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await?;

        info!("Follow documents: connected to Postgres (pool of {})", MAX_CONNECTIONS);
        Ok(Self { pool })
    }

    /// Creates or updates the `user_follows` table.
    pub async fn migrate(&self) -> Result<(), Error> {
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("user_follows schema is up to date");
        Ok(())
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}
