use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::state::AppState;

/// `GET /health` — liveness check.
///
/// Returns `200 OK` when both DuckDB and the session directory are reachable,
/// `503 Service Unavailable` with `"status": "degraded"` otherwise.
#[tracing::instrument(skip(state))]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let metadata = state.metadata.ping().await;
    let sessions = state.sessions.ping().await;

    if let Err(e) = &metadata {
        tracing::error!(error = %e, "Health check: DuckDB unreachable");
    }
    if let Err(e) = &sessions {
        tracing::error!(error = %e, "Health check: session store unreachable");
    }

    let (status, label) = if metadata.is_ok() && sessions.is_ok() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        Json(json!({
            "status": label,
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}
