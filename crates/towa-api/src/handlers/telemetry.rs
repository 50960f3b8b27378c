use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use towa_core::{TelemetryEvent, TelemetryKind};

use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TelemetryRequest {
    pub event: String,
    #[serde(default)]
    pub letter_id: Option<Uuid>,
    #[serde(default)]
    pub discovery_key: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub meta: Option<serde_json::Value>,
}

/// Record a client-reported event. 400 for an unknown event kind.
pub async fn record_event(
    State(state): State<AppState>,
    body: Result<Json<TelemetryRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(req) = body?;
    let kind: TelemetryKind = req.event.parse()?;

    let id = state
        .telemetry
        .record(TelemetryEvent {
            event: kind,
            letter_id: req.letter_id,
            discovery_key: req.discovery_key,
            value: req.value,
            meta: req.meta,
        })
        .await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "id": id,
    })))
}
