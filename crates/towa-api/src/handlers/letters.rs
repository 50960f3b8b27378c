//! Letter upload and retrieval.
//!
//! Uploads carry an envelope sealed on the client plus the recipient's
//! identity discovery key. The envelope is decoded strictly, re-encoded in
//! canonical form and stored as an opaque blob; the discovery index then
//! maps the key to the blob's id.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use towa_core::{LetterCost, ModerationRequest, NewLetter, TelemetryEvent, TelemetryKind};
use towa_crypto::{decode_envelope, encode_envelope, DiscoveryKey, LetterError};

use super::emit;
use crate::{ApiError, AppState};

/// Request body for storing a letter.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateLetterRequest {
    /// Identity discovery key of the recipient.
    pub discovery_key: DiscoveryKey,
    /// Envelope in wire form.
    pub envelope: serde_json::Value,
    #[serde(default)]
    pub mirror_opt_in: bool,
    #[serde(default)]
    pub sender_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLetterResponse {
    pub letter_id: Uuid,
    pub bytes: i64,
    pub cost: LetterCost,
}

/// Store and index a sealed letter.
///
/// # Returns
/// - 201 Created with the letter id, stored size and cost
/// - 400 Bad Request for a malformed body, key or envelope
/// - 413 Payload Too Large when the encrypted content exceeds the ceiling
/// - 422 Unprocessable Entity when moderation rejects the question
pub async fn create_letter(
    State(state): State<AppState>,
    body: Result<Json<CreateLetterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateLetterResponse>), ApiError> {
    let Json(req) = body?;

    let raw = serde_json::to_vec(&req.envelope)
        .map_err(|e| ApiError::BadRequest(format!("Invalid envelope: {}", e)))?;
    let envelope = decode_envelope(&raw)?;

    if envelope.encrypted_content.len() > state.max_payload_bytes {
        return Err(LetterError::PayloadTooLarge {
            size: envelope.encrypted_content.len(),
            limit: state.max_payload_bytes,
        }
        .into());
    }

    let verdict = state
        .moderation
        .check(&ModerationRequest {
            text: envelope.question.clone(),
            ..Default::default()
        })
        .await?;
    if !verdict.approved {
        warn!(
            subsystem = "api",
            component = "letters",
            op = "create",
            flags = ?verdict.flags,
            "Letter rejected by moderation"
        );
        return Err(ApiError::Unprocessable(verdict.message));
    }

    let stored = encode_envelope(&envelope).map_err(|e| ApiError::Internal(e.to_string()))?;
    let bytes = stored.len() as u64;
    let cost = LetterCost::from(&state.fees.estimate(bytes));

    let letter_id = state.content.put(stored.as_bytes()).await?;

    let new_letter = NewLetter {
        id: letter_id,
        discovery_key: req.discovery_key.to_string(),
        question: envelope.question.clone(),
        bytes: bytes as i64,
        cost,
        sender_id: req.sender_id.filter(|s| !s.trim().is_empty()),
        mirror_opt_in: req.mirror_opt_in,
    };

    let record = match state.index.put(new_letter).await {
        Ok(record) => record,
        Err(e) => {
            if let Err(cleanup) = state.content.delete(letter_id).await {
                warn!(
                    subsystem = "api",
                    component = "letters",
                    op = "create",
                    letter_id = %letter_id,
                    error = %cleanup,
                    "Orphaned blob left after index failure"
                );
            }
            return Err(e.into());
        }
    };

    info!(
        subsystem = "api",
        component = "letters",
        op = "create",
        letter_id = %record.id,
        bytes = record.bytes,
        "Letter stored"
    );

    emit(
        &state,
        TelemetryEvent::new(TelemetryKind::Sent)
            .with_letter(record.id)
            .with_discovery_key(record.discovery_key.clone())
            .with_value(record.bytes as f64)
            .with_meta(serde_json::json!({
                "cost_ar": record.cost_ar,
                "cost_fiat": record.cost_fiat,
            })),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(CreateLetterResponse {
            letter_id: record.id,
            bytes: record.bytes,
            cost,
        }),
    ))
}

/// Fetch an encoded envelope.
///
/// # Returns
/// - 200 OK with the envelope JSON exactly as stored
/// - 404 Not Found if no blob exists for the id
pub async fn get_letter(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let blob = state.content.get(id).await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], blob))
}
