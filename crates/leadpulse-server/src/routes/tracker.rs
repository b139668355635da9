use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use url::Url;

use leadpulse_core::recorder::TICK_INTERVAL_MS;

use crate::{error::AppError, state::AppState};

const TRACKER_TEMPLATE: &str = include_str!("../../assets/tracker.js");

/// `{public_url}/sites/{site_id}/{extra...}` with every segment
/// percent-encoded.
fn site_url(public_url: &str, site_id: &str, extra: &[&str]) -> Result<Url, AppError> {
    let mut url = Url::parse(public_url)
        .map_err(|e| anyhow::anyhow!("invalid public url {public_url:?}: {e}"))?;
    url.path_segments_mut()
        .map_err(|()| anyhow::anyhow!("public url {public_url:?} cannot carry a path"))?
        .pop_if_empty()
        .push("sites")
        .push(site_id)
        .extend(extra);
    Ok(url)
}

/// Fill the tracker template for one site. Values are inserted as JSON
/// literals so quotes in a site id cannot break out of the string.
pub fn render_tracker(site_id: &str, public_url: &str) -> Result<String, AppError> {
    let endpoint = site_url(public_url, site_id, &[])?.to_string();
    let site_literal = serde_json::to_string(site_id).map_err(anyhow::Error::from)?;
    let endpoint_literal = serde_json::to_string(&endpoint).map_err(anyhow::Error::from)?;

    Ok(TRACKER_TEMPLATE
        .replace("__LEADPULSE_SITE_ID__", &site_literal)
        .replace("__LEADPULSE_ENDPOINT__", &endpoint_literal)
        .replace("__LEADPULSE_TICK_MS__", &TICK_INTERVAL_MS.to_string()))
}

/// The `<script>` tag that loads a site's tracker.
pub fn tracking_snippet(site_id: &str, public_url: &str) -> Result<String, AppError> {
    let src = site_url(public_url, site_id, &["tracker.js"])?;
    let src = src
        .as_str()
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    Ok(format!(r#"<script src="{src}" defer></script>"#))
}

/// `GET /sites/{siteId}/tracker.js` — the recording snippet for a site.
#[tracing::instrument(skip(state))]
pub async fn tracker_script(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.require_site(&site_id).await?;
    let script = render_tracker(&site_id, &state.config.public_url)?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "public, max-age=300"),
        ],
        script,
    ))
}

/// `GET /sites/{siteId}/tracking-code` — the `<script>` tag to paste into a
/// generated site.
#[tracing::instrument(skip(state))]
pub async fn tracking_code(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.require_site(&site_id).await?;
    let snippet = tracking_snippet(&site_id, &state.config.public_url)?;
    Ok(Json(json!({ "snippet": snippet })))
}
