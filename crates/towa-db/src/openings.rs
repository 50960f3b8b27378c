//! Opening log backed by the `opening` table.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use towa_core::{new_v7, Error, Opening, OpeningLog, Result};

/// PostgreSQL opening log.
#[derive(Clone)]
pub struct PgOpeningLog {
    pool: Pool<Postgres>,
}

impl PgOpeningLog {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OpeningLog for PgOpeningLog {
    async fn record(&self, letter_id: Uuid, opener_id: &str) -> Result<Opening> {
        let row = sqlx::query(
            "INSERT INTO opening (id, letter_id, opener_id)
             VALUES ($1, $2, $3)
             RETURNING id, letter_id, opener_id, opened_at",
        )
        .bind(new_v7())
        .bind(letter_id)
        .bind(opener_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                Error::Conflict("Already opened".to_string())
            }
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                Error::LetterNotFound(letter_id)
            }
            other => Error::Database(other),
        })?;

        Ok(Opening {
            id: row.get("id"),
            letter_id: row.get("letter_id"),
            opener_id: row.get("opener_id"),
            opened_at: row.get("opened_at"),
        })
    }
}
