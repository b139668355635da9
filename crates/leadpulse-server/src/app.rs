use std::sync::Arc;

use axum::{
    http::HeaderValue,
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{routes, state::AppState};

/// CORS for the ingestion routes. The tracker runs on generated sites served
/// from other origins; with no configured origins any origin is allowed.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Construct the Axum [`Router`] with all routes and middleware attached.
///
/// `TraceLayer` wraps every request; `CorsLayer` answers preflights for the
/// tracker's cross-origin posts.
pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        .route(
            "/businesses",
            get(routes::businesses::list_businesses).post(routes::businesses::create_business),
        )
        .route("/businesses/{site_id}", get(routes::businesses::get_business))
        .route(
            "/businesses/{site_id}/stage",
            patch(routes::businesses::update_stage),
        )
        .route(
            "/businesses/{site_id}/notes",
            patch(routes::businesses::update_notes),
        )
        .route(
            "/sites/{site_id}/analytics",
            post(routes::analytics::record_analytics).get(routes::analytics::get_analytics),
        )
        .route(
            "/sites/{site_id}/visits",
            post(routes::visits::record_visit).get(routes::visits::list_visits),
        )
        .route(
            "/sites/{site_id}/visits/{visit_id}/flow",
            get(routes::visits::visit_flow),
        )
        .route(
            "/sites/{site_id}/tracker.js",
            get(routes::tracker::tracker_script),
        )
        .route(
            "/sites/{site_id}/tracking-code",
            get(routes::tracker::tracking_code),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
