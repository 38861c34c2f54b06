//! HTTP error mapping for the API endpoints.

use crate::scoring::{ScoringError, USER_MESSAGE};
use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Upload errors
    MissingUpload,
    /// Multipart body could not be read; carries the status the extractor chose (e.g. 413).
    Upload { status: StatusCode, message: String },

    // Decode / predict / assemble
    Scoring(ScoringError),

    // Generic errors
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::MissingUpload => (
                StatusCode::BAD_REQUEST,
                json!({ "error": super::render::UPLOAD_PROMPT }),
            ),
            AppError::Upload { status, message } => (*status, json!({ "error": message })),
            AppError::Scoring(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "error": USER_MESSAGE,
                    "detail": err.detail(),
                    "stage": err.kind(),
                }),
            ),
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };

        let mut body = body;
        body["status"] = json!(status.as_u16());
        (status, Json(body)).into_response()
    }
}

impl From<ScoringError> for AppError {
    fn from(err: ScoringError) -> Self {
        AppError::Scoring(err)
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::Upload {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::InternalError(format!("scoring task failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_error_keeps_its_status() {
        let resp = AppError::Upload {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: "length limit exceeded".into(),
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn missing_upload_is_bad_request() {
        assert_eq!(AppError::MissingUpload.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
