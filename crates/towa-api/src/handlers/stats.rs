use axum::{extract::State, Json};
use serde::Serialize;

use towa_core::defaults::ARWEAVE_GATEWAY;
use towa_core::PublicStats;

use crate::{ApiError, AppState};

/// Storage gateway block. Nothing is uploaded to the gateway, so no
/// round-trip time is reported.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayStatus {
    pub gateway: &'static str,
    pub ok: bool,
    pub rtt_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct PublicStatsResponse {
    #[serde(flatten)]
    pub stats: PublicStats,
    pub arweave: GatewayStatus,
}

/// Aggregate counts and costs. No per-letter data.
pub async fn public_stats(
    State(state): State<AppState>,
) -> Result<Json<PublicStatsResponse>, ApiError> {
    let stats = state.stats.public_stats().await?;
    Ok(Json(PublicStatsResponse {
        stats,
        arweave: GatewayStatus {
            gateway: ARWEAVE_GATEWAY,
            ok: true,
            rtt_ms: None,
        },
    }))
}
