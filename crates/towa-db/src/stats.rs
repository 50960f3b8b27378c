//! Aggregate statistics over letters and openings.
//!
//! Letter figures cover attributed letters only (those with a sender id).

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use towa_core::{
    CostStats, Error, LetterStats, OpeningStats, PublicStats, Result, StatsRepository,
};

/// PostgreSQL statistics source.
#[derive(Clone)]
pub struct PgStats {
    pool: Pool<Postgres>,
}

impl PgStats {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatsRepository for PgStats {
    async fn public_stats(&self) -> Result<PublicStats> {
        let letters = sqlx::query(
            "SELECT COUNT(*) AS count,
                    COUNT(DISTINCT sender_id) AS unique_senders,
                    COALESCE(SUM(cost_fiat), 0)::float8 AS total_fiat
             FROM letter
             WHERE sender_id IS NOT NULL",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        let openings = sqlx::query(
            "SELECT COUNT(*) AS count, COUNT(DISTINCT opener_id) AS unique_openers
             FROM opening",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        let letter_count: i64 = letters.get("count");
        let total_fiat: f64 = letters.get("total_fiat");

        Ok(PublicStats {
            letters: LetterStats {
                count: letter_count,
                unique_senders: letters.get("unique_senders"),
            },
            openings: OpeningStats {
                count: openings.get("count"),
                unique_openers: openings.get("unique_openers"),
            },
            cost: CostStats::from_totals(total_fiat, letter_count),
        })
    }
}
