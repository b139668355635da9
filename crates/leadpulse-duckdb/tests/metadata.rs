use leadpulse_duckdb::DuckDbBackend;
use leadpulse_metadata::{MetadataStore, NewBusiness, NewVisit, PipelineStage};

fn new_business(site_id: &str) -> NewBusiness {
    NewBusiness {
        site_id: site_id.to_string(),
        name: "Joe's Plumbing".to_string(),
        place_id: "ChIJ123".to_string(),
        region: "arkansas".to_string(),
        rating: Some(4.5),
        total_reviews: Some(87),
        has_website: Some(false),
        has_facebook: Some(true),
        city: Some("Little Rock".to_string()),
        ..NewBusiness::default()
    }
}

fn new_visit(site_id: &str, duration: i64, session_start_time: Option<i64>) -> NewVisit {
    NewVisit {
        site_id: site_id.to_string(),
        duration,
        source: "direct".to_string(),
        session_start_time,
    }
}

async fn setup() -> DuckDbBackend {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    db.create_business(new_business("joes-plumbing"))
        .await
        .expect("create business")
        .expect("site id is free");
    db
}

#[tokio::test]
async fn create_business_starts_in_first_stage() {
    let db = setup().await;
    let business = db
        .get_business("joes-plumbing")
        .await
        .expect("query")
        .expect("business exists");
    assert_eq!(business.id, 1);
    assert_eq!(business.pipeline_stage, PipelineStage::WebsiteCreated);
    assert_eq!(business.total_views, 0);
    assert_eq!(business.rating, Some(4.5));
    assert_eq!(business.city.as_deref(), Some("Little Rock"));
    assert!(business.last_viewed.is_none());
    assert!(business.notes.is_none());
}

#[tokio::test]
async fn duplicate_site_id_is_refused() {
    let db = setup().await;
    let again = db
        .create_business(new_business("joes-plumbing"))
        .await
        .expect("query");
    assert!(again.is_none());

    let second = db
        .create_business(new_business("ace-drains"))
        .await
        .expect("query")
        .expect("created");
    assert_eq!(second.id, 2);
    assert_eq!(db.list_businesses().await.expect("list").len(), 2);
}

#[tokio::test]
async fn business_exists_tracks_known_sites() {
    let db = setup().await;
    assert!(db.business_exists("joes-plumbing").await.expect("query"));
    assert!(!db.business_exists("joes").await.expect("query"));
}

#[tokio::test]
async fn stage_and_notes_updates() {
    let db = setup().await;
    let updated = db
        .update_stage("joes-plumbing", PipelineStage::LeadContacted)
        .await
        .expect("query")
        .expect("business exists");
    assert_eq!(updated.pipeline_stage, PipelineStage::LeadContacted);

    let updated = db
        .update_notes("joes-plumbing", "Call back Tuesday")
        .await
        .expect("query")
        .expect("business exists");
    assert_eq!(updated.notes.as_deref(), Some("Call back Tuesday"));

    assert!(db
        .update_stage("nobody", PipelineStage::FollowUp)
        .await
        .expect("query")
        .is_none());
}

#[tokio::test]
async fn recording_a_visit_bumps_business_and_advances_stage() {
    let db = setup().await;
    let visit = db
        .record_visit(new_visit("joes-plumbing", 42, Some(1_700_000_000_000)))
        .await
        .expect("query")
        .expect("business exists");
    assert_eq!(visit.id, 1);
    assert_eq!(visit.duration, 42);
    assert_eq!(visit.session_start_time, Some(1_700_000_000_000));

    let business = db
        .get_business("joes-plumbing")
        .await
        .expect("query")
        .expect("business exists");
    assert_eq!(business.total_views, 1);
    assert_eq!(business.pipeline_stage, PipelineStage::WebsiteViewed);
    assert_eq!(business.last_viewed, Some(visit.timestamp));
}

#[tokio::test]
async fn visit_does_not_regress_later_stages() {
    let db = setup().await;
    db.update_stage("joes-plumbing", PipelineStage::FollowUp)
        .await
        .expect("query");
    db.record_visit(new_visit("joes-plumbing", 5, None))
        .await
        .expect("query");
    let business = db
        .get_business("joes-plumbing")
        .await
        .expect("query")
        .expect("business exists");
    assert_eq!(business.pipeline_stage, PipelineStage::FollowUp);
    assert_eq!(business.total_views, 1);
}

#[tokio::test]
async fn zero_duration_visit_is_acknowledged_but_not_stored() {
    let db = setup().await;
    let visit = db
        .record_visit(new_visit("joes-plumbing", 0, None))
        .await
        .expect("query")
        .expect("business exists");
    assert_eq!(visit.id, 0);
    assert!(db.list_visits("joes-plumbing").await.expect("list").is_empty());

    let business = db
        .get_business("joes-plumbing")
        .await
        .expect("query")
        .expect("business exists");
    assert_eq!(business.total_views, 0);
    assert_eq!(business.pipeline_stage, PipelineStage::WebsiteCreated);
}

#[tokio::test]
async fn visit_for_unknown_site_is_not_written() {
    let db = setup().await;
    let visit = db
        .record_visit(new_visit("nobody", 10, None))
        .await
        .expect("query");
    assert!(visit.is_none());
    assert!(db.list_visits("nobody").await.expect("list").is_empty());
}

#[tokio::test]
async fn visits_are_listed_per_site_in_order() {
    let db = setup().await;
    db.create_business(new_business("ace-drains"))
        .await
        .expect("query");
    for (site, duration) in [("joes-plumbing", 3), ("ace-drains", 4), ("joes-plumbing", 9)] {
        db.record_visit(new_visit(site, duration, None))
            .await
            .expect("query");
    }

    let visits = db.list_visits("joes-plumbing").await.expect("list");
    let durations: Vec<i64> = visits.iter().map(|v| v.duration).collect();
    assert_eq!(durations, vec![3, 9]);
    assert!(visits[0].id < visits[1].id);

    let fetched = db
        .get_visit("joes-plumbing", visits[1].id)
        .await
        .expect("query")
        .expect("visit exists");
    assert_eq!(fetched, visits[1]);
    assert!(db
        .get_visit("ace-drains", visits[1].id)
        .await
        .expect("query")
        .is_none());
}

#[tokio::test]
async fn trait_object_reaches_the_same_store() {
    let db: Box<dyn MetadataStore> = Box::new(setup().await);
    db.ping().await.expect("ping");
    assert!(db.business_exists("joes-plumbing").await.expect("query"));
}

#[tokio::test]
async fn unknown_stored_stage_reads_as_first_stage() {
    let db = setup().await;
    {
        let conn = db.conn_for_test().await;
        conn.execute(
            "UPDATE businesses SET pipeline_stage = 'archived' WHERE site_id = 'joes-plumbing'",
            [],
        )
        .expect("corrupt stage");
    }
    let business = db
        .get_business("joes-plumbing")
        .await
        .expect("query")
        .expect("business exists");
    assert_eq!(business.pipeline_stage, PipelineStage::WebsiteCreated);
}
