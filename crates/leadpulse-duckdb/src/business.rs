use anyhow::Result;
use duckdb::Connection;
use tracing::{info, warn};

use leadpulse_metadata::{Business, NewBusiness, PipelineStage};

use crate::backend::from_millis;
use crate::DuckDbBackend;

pub(crate) const BUSINESS_COLUMNS: &str = "id, site_id, name, place_id, region, rating, \
     total_reviews, has_website, has_facebook, city, pipeline_stage, last_viewed_ms, \
     total_views, notes, owner_name, introduction, phone, review_link";

fn business_from_row(row: &duckdb::Row<'_>) -> duckdb::Result<Business> {
    let site_id: String = row.get(1)?;
    let stage: String = row.get(10)?;
    let pipeline_stage = stage.parse().unwrap_or_else(|_| {
        warn!(site_id = %site_id, stage = %stage, "Unrecognised pipeline stage in storage");
        PipelineStage::WebsiteCreated
    });
    let last_viewed_ms: Option<i64> = row.get(11)?;

    Ok(Business {
        id: row.get(0)?,
        site_id,
        name: row.get(2)?,
        place_id: row.get(3)?,
        region: row.get(4)?,
        rating: row.get(5)?,
        total_reviews: row.get(6)?,
        has_website: row.get(7)?,
        has_facebook: row.get(8)?,
        city: row.get(9)?,
        pipeline_stage,
        last_viewed: last_viewed_ms.map(from_millis),
        total_views: row.get(12)?,
        notes: row.get(13)?,
        owner_name: row.get(14)?,
        introduction: row.get(15)?,
        phone: row.get(16)?,
        review_link: row.get(17)?,
    })
}

/// Fetch one business; usable with a plain connection or inside a transaction.
pub(crate) fn fetch_business(conn: &Connection, site_id: &str) -> Result<Option<Business>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BUSINESS_COLUMNS} FROM businesses WHERE site_id = ?1"
    ))?;
    let mut rows = stmt.query_map(duckdb::params![site_id], business_from_row)?;
    let business = rows.next().transpose()?;
    Ok(business)
}

impl DuckDbBackend {
    pub async fn list_businesses(&self) -> Result<Vec<Business>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {BUSINESS_COLUMNS} FROM businesses ORDER BY id"
        ))?;
        let rows = stmt.query_map([], business_from_row)?;

        let mut businesses = Vec::new();
        for row in rows {
            businesses.push(row?);
        }
        Ok(businesses)
    }

    pub async fn get_business(&self, site_id: &str) -> Result<Option<Business>> {
        let conn = self.conn.lock().await;
        fetch_business(&conn, site_id)
    }

    pub async fn business_exists(&self, site_id: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .prepare("SELECT COUNT(*) FROM businesses WHERE site_id = ?1")?
            .query_row(duckdb::params![site_id], |row| row.get(0))?;
        Ok(count > 0)
    }

    /// Insert a new business in stage `website_created` with no views.
    ///
    /// Returns `None` when the site id is already registered.
    pub async fn create_business(&self, params: NewBusiness) -> Result<Option<Business>> {
        let conn = self.conn.lock().await;
        if fetch_business(&conn, &params.site_id)?.is_some() {
            return Ok(None);
        }

        let id: i64 = conn
            .prepare("SELECT COALESCE(MAX(id), 0) + 1 FROM businesses")?
            .query_row([], |row| row.get(0))?;

        conn.execute(
            "INSERT INTO businesses (id, site_id, name, place_id, region, rating, total_reviews, \
             has_website, has_facebook, city, pipeline_stage, last_viewed_ms, total_views, notes, \
             owner_name, introduction, phone, review_link) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, NULL, 0, NULL, ?12, ?13, ?14, ?15)",
            duckdb::params![
                id,
                params.site_id,
                params.name,
                params.place_id,
                params.region,
                params.rating,
                params.total_reviews,
                params.has_website,
                params.has_facebook,
                params.city,
                PipelineStage::WebsiteCreated.as_str(),
                params.owner_name,
                params.introduction,
                params.phone,
                params.review_link,
            ],
        )?;

        fetch_business(&conn, &params.site_id)
    }

    pub async fn update_stage(
        &self,
        site_id: &str,
        stage: PipelineStage,
    ) -> Result<Option<Business>> {
        let conn = self.conn.lock().await;
        let updated = conn.execute(
            "UPDATE businesses SET pipeline_stage = ?1 WHERE site_id = ?2",
            duckdb::params![stage.as_str(), site_id],
        )?;
        if updated == 0 {
            return Ok(None);
        }
        info!(site_id, stage = %stage, "Pipeline stage updated");
        fetch_business(&conn, site_id)
    }

    pub async fn update_notes(&self, site_id: &str, notes: &str) -> Result<Option<Business>> {
        let conn = self.conn.lock().await;
        let updated = conn.execute(
            "UPDATE businesses SET notes = ?1 WHERE site_id = ?2",
            duckdb::params![notes, site_id],
        )?;
        if updated == 0 {
            return Ok(None);
        }
        fetch_business(&conn, site_id)
    }
}
