//! Opening records.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use towa_core::{Opening, TelemetryEvent, TelemetryKind};

use super::emit;
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RecordOpeningRequest {
    pub letter_id: Uuid,
    pub opener_id: String,
}

/// Record that a reader opened a letter.
///
/// # Returns
/// - 201 Created with the opening
/// - 404 Not Found if the letter is not indexed
/// - 409 Conflict if this opener already opened this letter
pub async fn record_opening(
    State(state): State<AppState>,
    body: Result<Json<RecordOpeningRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Opening>), ApiError> {
    let Json(req) = body?;

    let opener_id = req.opener_id.trim();
    if opener_id.is_empty() {
        return Err(ApiError::BadRequest("openerId is required".to_string()));
    }

    let letter = state
        .index
        .get(req.letter_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Letter not found: {}", req.letter_id)))?;

    let opening = state.openings.record(letter.id, opener_id).await?;

    tracing::debug!(
        subsystem = "api",
        component = "openings",
        op = "record",
        letter_id = %letter.id,
        "Opening recorded"
    );

    emit(
        &state,
        TelemetryEvent::new(TelemetryKind::Decrypt)
            .with_letter(letter.id)
            .with_discovery_key(letter.discovery_key)
            .with_meta(serde_json::json!({ "opener_id": opening.opener_id })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(opening)))
}
