use anyhow::Result;
use chrono::Utc;
use tracing::info;

use leadpulse_metadata::{NewVisit, Visit};

use crate::backend::from_millis;
use crate::business::fetch_business;
use crate::DuckDbBackend;

const VISIT_COLUMNS: &str = "id, site_id, timestamp_ms, duration, source, session_start_time";

fn visit_from_row(row: &duckdb::Row<'_>) -> duckdb::Result<Visit> {
    let timestamp_ms: i64 = row.get(2)?;
    Ok(Visit {
        id: row.get(0)?,
        site_id: row.get(1)?,
        timestamp: from_millis(timestamp_ms),
        duration: row.get(3)?,
        source: row.get(4)?,
        session_start_time: row.get(5)?,
    })
}

impl DuckDbBackend {
    /// Record a visit and update the owning business in one transaction.
    ///
    /// - Unknown site → `None`, nothing written.
    /// - `duration == 0` → acknowledged with `id = 0` but not stored, and the
    ///   business is left untouched.
    /// - Otherwise the visit is inserted, the business gets `total_views + 1`
    ///   and `last_viewed = now`, and early pipeline stages advance to
    ///   `website_viewed`.
    pub async fn record_visit(&self, visit: NewVisit) -> Result<Option<Visit>> {
        let now_ms = Utc::now().timestamp_millis();
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let Some(business) = fetch_business(&tx, &visit.site_id)? else {
            return Ok(None);
        };

        if visit.duration == 0 {
            return Ok(Some(Visit {
                id: 0,
                site_id: visit.site_id,
                timestamp: from_millis(now_ms),
                duration: 0,
                source: visit.source,
                session_start_time: visit.session_start_time,
            }));
        }

        let id: i64 = tx
            .prepare("SELECT COALESCE(MAX(id), 0) + 1 FROM visits")?
            .query_row([], |row| row.get(0))?;

        tx.execute(
            "INSERT INTO visits (id, site_id, timestamp_ms, duration, source, session_start_time) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            duckdb::params![
                id,
                visit.site_id,
                now_ms,
                visit.duration,
                visit.source,
                visit.session_start_time,
            ],
        )?;

        let stage = business.pipeline_stage.after_visit();
        tx.execute(
            "UPDATE businesses SET total_views = total_views + 1, last_viewed_ms = ?1, \
             pipeline_stage = ?2 WHERE site_id = ?3",
            duckdb::params![now_ms, stage.as_str(), visit.site_id],
        )?;
        tx.commit()?;

        if stage != business.pipeline_stage {
            info!(
                site_id = %visit.site_id,
                from = %business.pipeline_stage,
                to = %stage,
                "Pipeline stage advanced by visit"
            );
        }
        info!(
            site_id = %visit.site_id,
            duration = visit.duration,
            source = %visit.source,
            "Visit recorded"
        );

        Ok(Some(Visit {
            id,
            site_id: visit.site_id,
            timestamp: from_millis(now_ms),
            duration: visit.duration,
            source: visit.source,
            session_start_time: visit.session_start_time,
        }))
    }

    /// All stored visits of a site, oldest first.
    pub async fn list_visits(&self, site_id: &str) -> Result<Vec<Visit>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {VISIT_COLUMNS} FROM visits WHERE site_id = ?1 ORDER BY timestamp_ms, id"
        ))?;
        let rows = stmt.query_map(duckdb::params![site_id], visit_from_row)?;

        let mut visits = Vec::new();
        for row in rows {
            visits.push(row?);
        }
        Ok(visits)
    }

    pub async fn get_visit(&self, site_id: &str, id: i64) -> Result<Option<Visit>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {VISIT_COLUMNS} FROM visits WHERE site_id = ?1 AND id = ?2"
        ))?;
        let mut rows = stmt.query_map(duckdb::params![site_id, id], visit_from_row)?;
        let visit = rows.next().transpose()?;
        Ok(visit)
    }
}
