use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use leadpulse_core::validate::FieldViolation;

/// Application-level errors that map directly to HTTP responses.
///
/// Every variant implements [`IntoResponse`] so Axum handlers can use
/// `Result<impl IntoResponse, AppError>` as their return type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    /// Payload failed schema validation; every offending field is listed.
    #[error("validation failed ({} violations)", .0.len())]
    Validation(Vec<FieldViolation>),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<Vec<FieldViolation>> for AppError {
    fn from(violations: Vec<FieldViolation>) -> Self {
        AppError::Validation(violations)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, field) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                msg.clone(),
                None,
            ),
            AppError::Validation(violations) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                "Request body failed validation".to_string(),
                violations.first().map(|v| v.field.clone()),
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let mut error = json!({
            "code": code,
            "message": message,
            "field": field,
        });
        if let AppError::Validation(violations) = &self {
            error["violations"] = json!(violations);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
