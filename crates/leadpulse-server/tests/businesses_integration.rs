use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use leadpulse_core::config::Config;
use leadpulse_duckdb::DuckDbBackend;
use leadpulse_filestore::FileSessionStore;
use leadpulse_metadata::MetadataStore;
use leadpulse_server::app::build_app;
use leadpulse_server::seed::{apply_seed, seed_from_files, SeedFile, SeedReport};
use leadpulse_server::state::AppState;

fn test_config() -> Config {
    Config {
        port: 0,
        data_dir: "/tmp/leadpulse-test".to_string(),
        cors_origins: vec![],
        public_url: "http://localhost:3000".to_string(),
        seed_files: vec![],
        duckdb_memory_limit: "1GB".to_string(),
    }
}

async fn setup() -> (tempfile::TempDir, axum::Router) {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    let dir = tempfile::tempdir().expect("tempdir");
    let sessions = FileSessionStore::init(dir.path().join("analytics"))
        .await
        .expect("session store");
    let state = Arc::new(AppState::new(
        Arc::new(db),
        Arc::new(sessions),
        test_config(),
    ));
    (dir, build_app(state))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

async fn json_body(response: axum::http::Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json")
}

fn new_business(site_id: &str) -> Value {
    json!({
        "siteId": site_id,
        "name": "Ace Drains",
        "placeId": "ChIJ999",
        "region": "arkansas",
        "rating": 4.8,
        "totalReviews": 120,
        "hasWebsite": false,
        "city": "Conway",
        "phone": "+1 501 555 0100"
    })
}

#[tokio::test]
async fn created_business_is_listed_and_trackable() {
    let (_dir, app) = setup().await;

    let response = app
        .clone()
        .oneshot(json_request("POST", "/businesses", new_business("ace-drains")))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json_body(response).await;
    assert_eq!(created["id"], json!(1));
    assert_eq!(created["pipelineStage"], json!("website_created"));
    assert_eq!(created["totalViews"], json!(0));
    assert_eq!(created["lastViewed"], Value::Null);
    assert_eq!(created["city"], json!("Conway"));

    let listed = json_body(
        app.clone()
            .oneshot(get_request("/businesses"))
            .await
            .expect("list"),
    )
    .await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let fetched = app
        .clone()
        .oneshot(get_request("/businesses/ace-drains"))
        .await
        .expect("get");
    assert_eq!(fetched.status(), StatusCode::OK);

    // The new site is immediately accepted by the site-scoped endpoints.
    let response = app
        .oneshot(get_request("/sites/ace-drains/analytics"))
        .await
        .expect("analytics");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn duplicate_site_id_conflicts() {
    let (_dir, app) = setup().await;
    app.clone()
        .oneshot(json_request("POST", "/businesses", new_business("ace-drains")))
        .await
        .expect("create");
    let response = app
        .oneshot(json_request("POST", "/businesses", new_business("ace-drains")))
        .await
        .expect("create again");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await["error"]["code"], json!("conflict"));
}

#[tokio::test]
async fn invalid_business_payload_is_rejected() {
    let (_dir, app) = setup().await;
    let response = app
        .oneshot(json_request(
            "POST",
            "/businesses",
            json!({ "siteId": "a/b", "name": 5, "placeId": "x", "region": "y", "fax": "" }),
        ))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    let mut fields: Vec<String> = body["error"]["violations"]
        .as_array()
        .expect("violations")
        .iter()
        .filter_map(|v| v["field"].as_str().map(str::to_string))
        .collect();
    fields.sort();
    assert_eq!(fields, vec!["fax", "name", "siteId"]);
}

#[tokio::test]
async fn stage_and_notes_can_be_updated() {
    let (_dir, app) = setup().await;
    app.clone()
        .oneshot(json_request("POST", "/businesses", new_business("ace-drains")))
        .await
        .expect("create");

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            "/businesses/ace-drains/stage",
            json!({ "stage": "lead_contacted" }),
        ))
        .await
        .expect("stage");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["pipelineStage"], json!("lead_contacted"));

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            "/businesses/ace-drains/stage",
            json!({ "stage": "archived" }),
        ))
        .await
        .expect("stage");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["field"], json!("stage"));

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            "/businesses/ace-drains/notes",
            json!({ "notes": "Owner prefers text messages" }),
        ))
        .await
        .expect("notes");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await["notes"],
        json!("Owner prefers text messages")
    );

    let response = app
        .oneshot(json_request(
            "PATCH",
            "/businesses/nobody/notes",
            json!({ "notes": "x" }),
        ))
        .await
        .expect("notes");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_business_is_not_found() {
    let (_dir, app) = setup().await;
    let response = app
        .oneshot(get_request("/businesses/nobody"))
        .await
        .expect("get");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn seed_inserts_new_businesses_and_skips_known_ones() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    let seed = r#"{
        "region": "arkansas",
        "businesses": {
            "joes-plumbing": {
                "name": "Joe's Plumbing",
                "place_id": "ChIJ123",
                "rating": 4.5,
                "total_reviews": 87,
                "has_website": false,
                "has_facebook": true,
                "city": "Little Rock",
                "owner_name": "Joe"
            },
            "ace-drains": {
                "name": "Ace Drains",
                "place_id": "ChIJ999",
                "rating": null,
                "total_reviews": 0,
                "has_website": true,
                "has_facebook": false,
                "city": "Conway"
            }
        }
    }"#;

    let report = apply_seed(&db, SeedFile::parse(seed).expect("parse"))
        .await
        .expect("seed");
    assert_eq!(report, SeedReport { inserted: 2, skipped: 0, rejected: 0 });

    let report = apply_seed(&db, SeedFile::parse(seed).expect("parse"))
        .await
        .expect("seed again");
    assert_eq!(report, SeedReport { inserted: 0, skipped: 2, rejected: 0 });

    let joes = db
        .get_business("joes-plumbing")
        .await
        .expect("query")
        .expect("seeded");
    assert_eq!(joes.region, "arkansas");
    assert_eq!(joes.owner_name.as_deref(), Some("Joe"));
    assert_eq!(db.list_businesses().await.expect("list").len(), 2);
}

#[tokio::test]
async fn malformed_seed_file_is_an_error() {
    assert!(SeedFile::parse(r#"{"businesses": {"x": {"name": 1}}}"#).is_err());
}

#[tokio::test]
async fn seed_from_missing_file_does_not_fail() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    leadpulse_server::seed::seed_from_file(&db, std::path::Path::new("/nonexistent/seed.json"))
        .await;
    assert!(db.list_businesses().await.expect("list").is_empty());
    let store: &dyn MetadataStore = &db;
    store.ping().await.expect("ping");
}

#[tokio::test]
async fn seed_entries_with_unusable_site_ids_are_skipped() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    let seed = r#"{
        "region": "arkansas",
        "businesses": {
            "..joes": { "name": "Joe's Plumbing", "place_id": "ChIJ123" },
            "ace-drains": { "name": "Ace Drains", "place_id": "ChIJ999" }
        }
    }"#;
    let report = apply_seed(&db, SeedFile::parse(seed).expect("parse"))
        .await
        .expect("seed");
    assert_eq!(report, SeedReport { inserted: 1, skipped: 0, rejected: 1 });
    assert!(db.get_business("..joes").await.expect("query").is_none());

    let dir = tempfile::tempdir().expect("tempdir");
    let sessions = FileSessionStore::init(dir.path().join("analytics"))
        .await
        .expect("session store");
    let app = build_app(Arc::new(AppState::new(
        Arc::new(db),
        Arc::new(sessions),
        test_config(),
    )));
    let response = app
        .oneshot(get_request("/sites/..joes/analytics"))
        .await
        .expect("analytics");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn every_configured_seed_file_is_applied() {
    let dir = tempfile::tempdir().expect("tempdir");
    let arkansas = dir.path().join("arkansas.json");
    let alabama = dir.path().join("alabama.json");
    std::fs::write(
        &arkansas,
        r#"{"region": "arkansas", "businesses": {"joes-plumbing": {"name": "Joe's Plumbing", "place_id": "ChIJ123"}}}"#,
    )
    .expect("write arkansas");
    std::fs::write(
        &alabama,
        r#"{"region": "alabama", "businesses": {"bama-roofing": {"name": "Bama Roofing", "place_id": "ChIJ456"}}}"#,
    )
    .expect("write alabama");

    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    let paths = vec![
        arkansas.to_string_lossy().into_owned(),
        alabama.to_string_lossy().into_owned(),
    ];
    seed_from_files(&db, &paths).await;

    let joes = db
        .get_business("joes-plumbing")
        .await
        .expect("query")
        .expect("seeded");
    assert_eq!(joes.region, "arkansas");
    let bama = db
        .get_business("bama-roofing")
        .await
        .expect("query")
        .expect("seeded");
    assert_eq!(bama.region, "alabama");
}
