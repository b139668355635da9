use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use tracing::info;

use leadpulse_core::validate::{is_valid_site_id, FieldViolation, Validator, ViolationCode};
use leadpulse_metadata::{NewBusiness, PipelineStage};

use crate::{error::AppError, routes::json_payload, state::AppState};

const BUSINESS_FIELDS: &[&str] = &[
    "siteId",
    "name",
    "placeId",
    "region",
    "rating",
    "totalReviews",
    "hasWebsite",
    "hasFacebook",
    "city",
    "ownerName",
    "introduction",
    "phone",
    "reviewLink",
];

fn validate_new_business(value: Value) -> Result<NewBusiness, Vec<FieldViolation>> {
    let mut v = Validator::new();
    if let Some(map) = v.object("", &value, BUSINESS_FIELDS) {
        if let Some(site_id) = v.string(map, "", "siteId") {
            if !is_valid_site_id(site_id) {
                v.violate(
                    "siteId",
                    ViolationCode::InvalidValue,
                    "site id must be non-empty and free of path separators",
                );
            }
        }
        v.string(map, "", "name");
        v.string(map, "", "placeId");
        v.string(map, "", "region");
        v.optional_number(map, "", "rating");
        v.optional_integer(map, "", "totalReviews");
        v.optional_bool(map, "", "hasWebsite");
        v.optional_bool(map, "", "hasFacebook");
        for key in ["city", "ownerName", "introduction", "phone", "reviewLink"] {
            v.optional_string(map, "", key);
        }
    }
    v.finish()?;

    serde_json::from_value(value).map_err(|e| {
        vec![FieldViolation {
            field: "body".to_string(),
            code: ViolationCode::InvalidValue,
            message: e.to_string(),
        }]
    })
}

/// `GET /businesses` — every business, ordered by id.
#[tracing::instrument(skip(state))]
pub async fn list_businesses(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.metadata.list_businesses().await?))
}

/// `GET /businesses/{siteId}`
#[tracing::instrument(skip(state))]
pub async fn get_business(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let business = state
        .metadata
        .get_business(&site_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Unknown site: {site_id}")))?;
    Ok(Json(business))
}

/// `POST /businesses` — register a lead. New businesses start in
/// `website_created` with no views.
///
/// ## Response
/// `201 Created` with the business; `409 Conflict` if the site id is taken.
#[tracing::instrument(skip(state, body))]
pub async fn create_business(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let params = validate_new_business(json_payload(&body)?)?;
    let site_id = params.site_id.clone();

    let business = state
        .metadata
        .create_business(params)
        .await?
        .ok_or_else(|| AppError::Conflict(format!("Site id already registered: {site_id}")))?;

    state.remember_site(&business.site_id).await;
    info!(site_id = %business.site_id, id = business.id, "Business created");
    Ok((StatusCode::CREATED, Json(business)))
}

/// `PATCH /businesses/{siteId}/stage` — body `{ "stage": "<pipeline stage>" }`.
#[tracing::instrument(skip(state, body))]
pub async fn update_stage(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let value = json_payload(&body)?;

    let mut v = Validator::new();
    let mut stage = None;
    if let Some(map) = v.object("", &value, &["stage"]) {
        if let Some(raw) = v.string(map, "", "stage") {
            match raw.parse::<PipelineStage>() {
                Ok(parsed) => stage = Some(parsed),
                Err(e) => {
                    let allowed: Vec<&str> =
                        PipelineStage::ALL.iter().map(|s| s.as_str()).collect();
                    v.violate(
                        "stage",
                        ViolationCode::InvalidValue,
                        format!("{e}; expected one of {}", allowed.join(", ")),
                    );
                }
            }
        }
    }
    v.finish()?;
    let stage = stage.ok_or_else(|| AppError::BadRequest("stage is required".to_string()))?;

    let business = state
        .metadata
        .update_stage(&site_id, stage)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Unknown site: {site_id}")))?;
    Ok(Json(business))
}

/// `PATCH /businesses/{siteId}/notes` — body `{ "notes": "..." }`.
#[tracing::instrument(skip(state, body))]
pub async fn update_notes(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let value = json_payload(&body)?;

    let mut v = Validator::new();
    let notes = v
        .object("", &value, &["notes"])
        .and_then(|map| v.string(map, "", "notes"))
        .map(str::to_string);
    v.finish()?;
    let notes = notes.ok_or_else(|| AppError::BadRequest("notes is required".to_string()))?;

    let business = state
        .metadata
        .update_notes(&site_id, &notes)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Unknown site: {site_id}")))?;
    Ok(Json(business))
}
