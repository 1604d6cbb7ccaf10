// kickwatch-core/src/repositories/postgres/follows.rs
//
// Follow documents of authenticated users, one row per (user_id, slug) in
// `user_follows`. Listing is oldest first so that the document order matches
// the order in which the user followed the channels.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use kickwatch_common::error::Error;
use kickwatch_common::models::FollowRecord;
use kickwatch_common::traits::FollowDocumentRepository;

#[derive(Clone)]
pub struct PostgresFollowRepository {
    pool: Pool<Postgres>,
}

impl PostgresFollowRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get_follow(&self, user_id: &str, slug: &str) -> Result<Option<FollowRecord>, Error> {
        let q = r#"
            SELECT slug, added_at
            FROM user_follows
            WHERE user_id = $1
              AND slug = $2
        "#;
        let row_opt = sqlx::query(q)
            .bind(user_id)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(r) = row_opt {
            Ok(Some(FollowRecord {
                slug:     r.try_get("slug")?,
                added_at: r.try_get("added_at")?,
            }))
        } else {
            Ok(None)
        }
    }
}

#[async_trait]
impl FollowDocumentRepository for PostgresFollowRepository {
    async fn list_follow_ids(&self, user_id: &str) -> Result<Vec<String>, Error> {
        let q = r#"
            SELECT slug
            FROM user_follows
            WHERE user_id = $1
            ORDER BY added_at, slug
        "#;
        let rows = sqlx::query(q)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            out.push(r.try_get("slug")?);
        }
        Ok(out)
    }

    async fn upsert_follow(&self, user_id: &str, record: &FollowRecord) -> Result<(), Error> {
        // Re-following keeps the original added_at, so the position in the list is stable.
        let q = r#"
            INSERT INTO user_follows (user_id, slug, added_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, slug)
            DO NOTHING
        "#;
        sqlx::query(q)
            .bind(user_id)
            .bind(&record.slug)
            .bind(record.added_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_follow(&self, user_id: &str, slug: &str) -> Result<(), Error> {
        sqlx::query("DELETE FROM user_follows WHERE user_id = $1 AND slug = $2")
            .bind(user_id)
            .bind(slug)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
