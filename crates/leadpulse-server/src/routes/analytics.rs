use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::info;

use leadpulse_core::{
    aggregate::{aggregate, load_sessions},
    validate::validate_session,
};

use crate::{error::AppError, routes::json_payload, state::AppState};

/// `POST /sites/{siteId}/analytics` — store one recorded session.
///
/// The body is validated as a whole and every violation is reported; nothing
/// is written unless the session is valid. The stored record is the body
/// exactly as received.
///
/// ## Response
/// `201 Created` with `{ "message": "Analytics recorded successfully" }`.
#[tracing::instrument(skip(state, body))]
pub async fn record_analytics(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    state.require_site(&site_id).await?;

    let validated = validate_session(json_payload(&body)?)?;
    let page_views = validated.session.page_views.len();
    let record = state.sessions.append(&site_id, &validated).await?;

    info!(site_id = %site_id, record = %record, page_views, "Session recorded");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Analytics recorded successfully" })),
    ))
}

/// `GET /sites/{siteId}/analytics` — aggregate every stored session of a site.
///
/// Scans the whole site on each call. Corrupt records are skipped and logged.
#[tracing::instrument(skip(state))]
pub async fn get_analytics(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.require_site(&site_id).await?;

    let records = state.sessions.scan(&site_id).await?;
    let sessions = load_sessions(&records);
    if sessions.len() < records.len() {
        tracing::warn!(
            site_id = %site_id,
            skipped = records.len() - sessions.len(),
            "Some session records could not be read"
        );
    }

    Ok(Json(aggregate(&sessions)))
}
