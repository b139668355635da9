pub mod analytics;
pub mod businesses;
pub mod health;
pub mod tracker;
pub mod visits;

use axum::body::Bytes;
use serde_json::Value;

use leadpulse_core::validate::{FieldViolation, ViolationCode};

use crate::error::AppError;

/// Parse a request body as JSON regardless of its content type.
///
/// `navigator.sendBeacon` posts strings as `text/plain`, so the `Json`
/// extractor's content-type check cannot be used on ingestion routes.
pub(crate) fn json_payload(body: &Bytes) -> Result<Value, AppError> {
    serde_json::from_slice(body).map_err(|e| {
        AppError::Validation(vec![FieldViolation {
            field: "body".to_string(),
            code: ViolationCode::InvalidValue,
            message: format!("malformed JSON: {e}"),
        }])
    })
}
