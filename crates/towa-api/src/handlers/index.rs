//! Discovery index lookup.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use towa_core::defaults::{CANDIDATE_LIMIT, CANDIDATE_LIMIT_MAX};
use towa_core::{Candidate, TelemetryEvent, TelemetryKind};
use towa_crypto::DiscoveryKey;

use super::emit;
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListCandidatesQuery {
    /// Maximum candidates to return (default 50, capped at 200).
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCandidatesResponse {
    pub discovery_key: String,
    pub candidates: Vec<Candidate>,
    pub total: usize,
}

/// List letters addressed to an identity, newest first.
///
/// Only the letter id, creation time and public question are returned;
/// the reader fetches and opens envelopes separately.
pub async fn list_candidates(
    State(state): State<AppState>,
    Path(discovery_key): Path<String>,
    query: Result<Query<ListCandidatesQuery>, QueryRejection>,
) -> Result<Json<ListCandidatesResponse>, ApiError> {
    let Query(query) = query?;
    let key: DiscoveryKey = discovery_key.parse()?;

    let limit = match query.limit {
        None => CANDIDATE_LIMIT,
        Some(n) if n < 1 => {
            return Err(ApiError::BadRequest("limit must be at least 1".to_string()))
        }
        Some(n) => n.min(CANDIDATE_LIMIT_MAX),
    };

    let candidates = state.index.list(key.as_str(), limit).await?;
    let total = candidates.len();

    emit(
        &state,
        TelemetryEvent::new(TelemetryKind::Found)
            .with_discovery_key(key.as_str())
            .with_value(total as f64)
            .with_meta(serde_json::json!({ "total_letters": total })),
    )
    .await;

    Ok(Json(ListCandidatesResponse {
        discovery_key: key.to_string(),
        candidates,
        total,
    }))
}
