//! Draft moderation.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;

use towa_core::{ModerationRequest, ModerationVerdict};

use crate::{ApiError, AppState};

/// Attachment metadata submitted with a draft. Contents are never sent.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DraftAttachment {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default, rename = "type")]
    pub content_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModerationCheckRequest {
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<DraftAttachment>,
}

/// Check a draft before it is sealed. 400 when `content` is empty.
pub async fn check_content(
    State(state): State<AppState>,
    body: Result<Json<ModerationCheckRequest>, JsonRejection>,
) -> Result<Json<ModerationVerdict>, ApiError> {
    let Json(req) = body?;
    if req.content.is_empty() {
        return Err(ApiError::BadRequest(
            "Content is required for moderation check".to_string(),
        ));
    }

    let request = ModerationRequest {
        attachment_count: req.attachments.len(),
        attachment_bytes: req.attachments.iter().map(|a| a.size).sum(),
        text: req.content,
    };
    Ok(Json(state.moderation.check(&request).await?))
}
