//! HTTP error mapping.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use towa_crypto::LetterError;
use uuid::Uuid;

/// Errors returned by handlers.
///
/// Client errors carry a message for the response body. `Internal` carries
/// detail for the operator log only; the client sees an incident id.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    PayloadTooLarge(String),
    Unprocessable(String),
    Internal(String),
}

impl From<towa_core::Error> for ApiError {
    fn from(err: towa_core::Error) -> Self {
        match err {
            towa_core::Error::NotFound(msg) => ApiError::NotFound(msg),
            towa_core::Error::LetterNotFound(id) => {
                ApiError::NotFound(format!("Letter not found: {}", id))
            }
            towa_core::Error::Conflict(msg) => ApiError::Conflict(msg),
            towa_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<LetterError> for ApiError {
    fn from(err: LetterError) -> Self {
        match err {
            LetterError::MalformedEnvelope(_)
            | LetterError::InvalidInput(_)
            | LetterError::InvalidKdfParameters(_) => ApiError::BadRequest(err.to_string()),
            LetterError::PayloadTooLarge { .. } => ApiError::PayloadTooLarge(err.to_string()),
            other => ApiError::Internal(other.log_detail()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(rejection.body_text())
        } else {
            ApiError::BadRequest(rejection.body_text())
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json_error(msg)),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, json_error(msg)),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, json_error(msg)),
            ApiError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, json_error(msg)),
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, json_error(msg)),
            ApiError::Internal(detail) => {
                let incident = Uuid::now_v7();
                tracing::error!(
                    subsystem = "api",
                    component = "error",
                    incident = %incident,
                    detail = %detail,
                    "Internal error"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({
                        "error": "internal_error",
                        "incident": incident,
                    }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

fn json_error(message: String) -> serde_json::Value {
    serde_json::json!({ "error": message })
}
