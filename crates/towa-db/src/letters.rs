//! Discovery index backed by the `letter` table.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use tracing::info;
use uuid::Uuid;

use towa_core::{Candidate, DiscoveryIndex, Error, LetterRecord, NewLetter, Result};

/// PostgreSQL discovery index.
#[derive(Clone)]
pub struct PgLetterIndex {
    pool: Pool<Postgres>,
}

impl PgLetterIndex {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_row(row: &PgRow) -> LetterRecord {
        LetterRecord {
            id: row.get("id"),
            discovery_key: row.get("discovery_key"),
            question: row.get("question"),
            bytes: row.get("bytes"),
            cost_ar: row.get("cost_ar"),
            cost_fiat: row.get("cost_fiat"),
            sender_id: row.get("sender_id"),
            mirror_opt_in: row.get("mirror_opt_in"),
            mirror_id: row.get("mirror_id"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl DiscoveryIndex for PgLetterIndex {
    async fn put(&self, letter: NewLetter) -> Result<LetterRecord> {
        let record = LetterRecord::from_new(letter, Utc::now());
        sqlx::query(
            "INSERT INTO letter (id, discovery_key, question, bytes, cost_ar, cost_fiat,
                                 sender_id, mirror_opt_in, mirror_id, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(record.id)
        .bind(&record.discovery_key)
        .bind(&record.question)
        .bind(record.bytes)
        .bind(record.cost_ar)
        .bind(record.cost_fiat)
        .bind(&record.sender_id)
        .bind(record.mirror_opt_in)
        .bind(&record.mirror_id)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                Error::Conflict(format!("letter {} already indexed", record.id))
            }
            other => Error::Database(other),
        })?;

        info!(
            subsystem = "database",
            component = "letters",
            op = "put",
            letter_id = %record.id,
            bytes = record.bytes,
            "Letter indexed"
        );
        Ok(record)
    }

    async fn list(&self, discovery_key: &str, limit: i64) -> Result<Vec<Candidate>> {
        let rows = sqlx::query(
            "SELECT id, question, created_at
             FROM letter
             WHERE discovery_key = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2",
        )
        .bind(discovery_key)
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|r| Candidate {
                letter_id: r.get("id"),
                question: r.get("question"),
                created_at: r.get("created_at"),
            })
            .collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<LetterRecord>> {
        let row = sqlx::query(
            "SELECT id, discovery_key, question, bytes, cost_ar, cost_fiat,
                    sender_id, mirror_opt_in, mirror_id, created_at
             FROM letter WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(Self::parse_row))
    }
}
