use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Deserialize;

use towa_core::FeeEstimate;

use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeeQuery {
    pub bytes: Option<i64>,
}

/// Estimate the storage fee for `bytes` bytes. 400 unless `bytes > 0`.
pub async fn estimate_fee(
    State(state): State<AppState>,
    query: Result<Query<FeeQuery>, QueryRejection>,
) -> Result<Json<FeeEstimate>, ApiError> {
    let Query(query) = query?;
    let bytes = match query.bytes {
        Some(n) if n > 0 => n as u64,
        _ => {
            return Err(ApiError::BadRequest(
                "Valid bytes parameter is required".to_string(),
            ))
        }
    };
    Ok(Json(state.fees.estimate(bytes)))
}
