//! Telemetry sink backed by the `telemetry_event` table.

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use towa_core::{new_v7, Error, Result, TelemetryEvent, TelemetrySink};

/// PostgreSQL telemetry sink.
#[derive(Clone)]
pub struct PgTelemetrySink {
    pool: Pool<Postgres>,
}

impl PgTelemetrySink {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TelemetrySink for PgTelemetrySink {
    async fn record(&self, event: TelemetryEvent) -> Result<Uuid> {
        let id = new_v7();
        sqlx::query(
            "INSERT INTO telemetry_event (id, event, letter_id, discovery_key, value, meta)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(event.event.as_str())
        .bind(event.letter_id)
        .bind(&event.discovery_key)
        .bind(event.value)
        .bind(&event.meta)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(id)
    }
}
