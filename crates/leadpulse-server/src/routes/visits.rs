use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use leadpulse_core::{
    aggregate::load_sessions,
    flow::{correlate, Correlation},
    validate::validate_visit,
};
use leadpulse_metadata::NewVisit;

use crate::{error::AppError, routes::json_payload, state::AppState};

/// `POST /sites/{siteId}/visits` — record a visit-duration report.
///
/// `duration` arrives in (possibly fractional) seconds and is stored rounded
/// to whole seconds. A zero-length visit is acknowledged with `id: 0` but not
/// stored.
///
/// ## Response
/// `201 Created` with the visit.
#[tracing::instrument(skip(state, body))]
pub async fn record_visit(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    state.require_site(&site_id).await?;

    let report = validate_visit(&json_payload(&body)?)?;
    let visit = state
        .metadata
        .record_visit(NewVisit {
            site_id: site_id.clone(),
            duration: report.duration.round() as i64,
            source: report.source,
            session_start_time: report.session_start_time,
        })
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Unknown site: {site_id}")))?;

    Ok((StatusCode::CREATED, Json(visit)))
}

/// `GET /sites/{siteId}/visits` — all stored visits, oldest first.
#[tracing::instrument(skip(state))]
pub async fn list_visits(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.require_site(&site_id).await?;
    let visits = state.metadata.list_visits(&site_id).await?;
    Ok(Json(visits))
}

/// `GET /sites/{siteId}/visits/{visitId}/flow` — join a visit with the
/// session recorded at the same unload and return its page-transition graph.
///
/// The join uses the visit's `sessionStartTime` only. Visits without it, or
/// whose session never arrived, come back with `matched: false`, a `reason`
/// and `flow: null`.
#[tracing::instrument(skip(state))]
pub async fn visit_flow(
    State(state): State<Arc<AppState>>,
    Path((site_id, visit_id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, AppError> {
    state.require_site(&site_id).await?;

    let visit = state
        .metadata
        .get_visit(&site_id, visit_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Unknown visit: {visit_id}")))?;

    let records = state.sessions.scan(&site_id).await?;
    let sessions = load_sessions(&records);

    let body = match correlate(visit.session_start_time, &sessions) {
        Correlation::Matched { session_id, flow } => json!({
            "visit": visit,
            "matched": true,
            "sessionId": session_id,
            "flow": flow,
        }),
        Correlation::Unmatched(reason) => json!({
            "visit": visit,
            "matched": false,
            "reason": reason,
            "flow": null,
        }),
    };
    Ok(Json(body))
}
