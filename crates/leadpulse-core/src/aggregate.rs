//! Per-site analytics aggregation over stored session records.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::error::CoreError;
use crate::session::ValidatedSession;
use crate::store::SessionRecord;
use crate::validate::validate_session;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteAnalytics {
    /// Path → number of page views, counting every occurrence.
    pub page_views: BTreeMap<String, u64>,
    /// Number of sessions that were read successfully.
    pub total_visits: u64,
    pub device_stats: DeviceStats,
    /// One entry per session, ordered by `startTime`.
    pub visits: Vec<SessionVisit>,
}

/// Histograms counted once per session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStats {
    pub browsers: BTreeMap<String, u64>,
    pub os: BTreeMap<String, u64>,
    /// desktop / mobile / tablet / unknown, classified from the user agent.
    pub device_types: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionVisit {
    /// The session's `startTime`.
    pub id: i64,
    pub navigation_path: Vec<String>,
    /// Page views exactly as recorded.
    pub page_views: Value,
}

/// Parse and re-validate one stored record.
pub fn parse_record(record: &SessionRecord) -> Result<ValidatedSession, CoreError> {
    let value: Value = serde_json::from_str(&record.body)?;
    validate_session(value).map_err(|violations| CoreError::InvalidRecord(violations.len()))
}

/// Parse every record, skipping (and logging) the ones that are corrupt, and
/// order the survivors by `startTime`, then arrival.
pub fn load_sessions(records: &[SessionRecord]) -> Vec<ValidatedSession> {
    let mut parsed: Vec<(i64, ValidatedSession)> = records
        .iter()
        .filter_map(|record| match parse_record(record) {
            Ok(session) => Some((record.arrived_at, session)),
            Err(e) => {
                warn!(record = %record.name, error = %e, "Skipping unreadable session record");
                None
            }
        })
        .collect();
    parsed.sort_by_key(|(arrived_at, s)| (s.session.start_time, *arrived_at));
    parsed.into_iter().map(|(_, session)| session).collect()
}

/// Classify a user agent into a coarse device type.
pub fn device_type(parser: &woothee::parser::Parser, user_agent: &str) -> &'static str {
    let Some(result) = parser.parse(user_agent) else {
        return "unknown";
    };
    match result.category {
        "smartphone" | "mobilephone" => "mobile",
        "tablet" => "tablet",
        "UNKNOWN" => "unknown",
        _ => "desktop",
    }
}

fn bump(map: &mut BTreeMap<String, u64>, key: &str) {
    *map.entry(key.to_string()).or_default() += 1;
}

/// Reduce `sessions` (already ordered) into the dashboard summary.
pub fn aggregate(sessions: &[ValidatedSession]) -> SiteAnalytics {
    let parser = woothee::parser::Parser::new();
    let mut out = SiteAnalytics::default();

    for ValidatedSession { raw, session } in sessions {
        for view in &session.page_views {
            bump(&mut out.page_views, &view.path);
        }

        let device = &session.device_info;
        bump(&mut out.device_stats.browsers, &device.browser);
        bump(&mut out.device_stats.os, &device.os);
        bump(
            &mut out.device_stats.device_types,
            device_type(&parser, &device.browser),
        );

        out.visits.push(SessionVisit {
            id: session.start_time,
            navigation_path: session.navigation_path.clone(),
            page_views: raw
                .get("pageViews")
                .cloned()
                .unwrap_or_else(|| Value::Array(Vec::new())),
        });
        out.total_visits += 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
        AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
    const WINDOWS_CHROME: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
        AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

    fn session_json(start_time: i64, browser: &str, os: &str, paths: &[&str]) -> Value {
        let device = json!({
            "browser": browser,
            "os": os,
            "screenSize": { "width": 390, "height": 844 }
        });
        let views: Vec<Value> = paths
            .iter()
            .enumerate()
            .map(|(i, p)| {
                json!({
                    "path": p,
                    "timestamp": start_time + i as i64,
                    "timeSpent": 1000,
                    "scrollDepth": 80,
                    "deviceInfo": device,
                    "location": { "country": "Unknown", "region": "Unknown" }
                })
            })
            .collect();
        json!({
            "siteId": "joes-plumbing",
            "startTime": start_time,
            "lastActive": start_time + 1000,
            "deviceInfo": device,
            "pageViews": views,
            "clicks": [],
            "navigationPath": paths,
        })
    }

    fn record(arrived_at: i64, body: String) -> SessionRecord {
        SessionRecord {
            name: format!("analytics_joes-plumbing_{arrived_at}.json"),
            arrived_at,
            body,
        }
    }

    #[test]
    fn no_sessions_yields_empty_summary() {
        let summary = aggregate(&load_sessions(&[]));
        assert_eq!(summary, SiteAnalytics::default());
        assert_eq!(summary.total_visits, 0);
    }

    #[test]
    fn page_views_count_every_occurrence() {
        let records: Vec<SessionRecord> = (0..5)
            .map(|i| record(i, session_json(100 + i, IPHONE, "iPhone", &["/a"]).to_string()))
            .chain(std::iter::once(record(
                9,
                session_json(200, IPHONE, "iPhone", &["/a", "/b", "/a"]).to_string(),
            )))
            .collect();

        let summary = aggregate(&load_sessions(&records));
        assert_eq!(summary.total_visits, 6);
        assert_eq!(summary.page_views.get("/a"), Some(&7));
        assert_eq!(summary.page_views.get("/b"), Some(&1));
    }

    #[test]
    fn device_stats_count_once_per_session() {
        let records = vec![
            record(1, session_json(1, IPHONE, "iPhone", &["/", "/about", "/"]).to_string()),
            record(2, session_json(2, WINDOWS_CHROME, "Win32", &["/"]).to_string()),
            record(3, session_json(3, IPHONE, "iPhone", &[]).to_string()),
        ];
        let stats = aggregate(&load_sessions(&records)).device_stats;
        assert_eq!(stats.browsers.get(IPHONE), Some(&2));
        assert_eq!(stats.browsers.get(WINDOWS_CHROME), Some(&1));
        assert_eq!(stats.os.get("iPhone"), Some(&2));
        assert_eq!(stats.os.get("Win32"), Some(&1));
        assert_eq!(stats.device_types.get("mobile"), Some(&2));
        assert_eq!(stats.device_types.get("desktop"), Some(&1));
    }

    #[test]
    fn corrupt_records_are_skipped() {
        let mut missing_field = session_json(5, IPHONE, "iPhone", &["/"]);
        missing_field
            .as_object_mut()
            .expect("object")
            .remove("clicks");
        let records = vec![
            record(1, "{not json".to_string()),
            record(2, session_json(7, IPHONE, "iPhone", &["/x"]).to_string()),
            record(3, missing_field.to_string()),
        ];
        let summary = aggregate(&load_sessions(&records));
        assert_eq!(summary.total_visits, 1);
        assert_eq!(summary.visits[0].id, 7);
    }

    #[test]
    fn visits_are_ordered_by_start_time_and_keep_raw_page_views() {
        let later = session_json(2_000, IPHONE, "iPhone", &["/late"]);
        let earlier = session_json(1_000, IPHONE, "iPhone", &["/early"]);
        let records = vec![record(10, later.to_string()), record(11, earlier.to_string())];

        let summary = aggregate(&load_sessions(&records));
        let ids: Vec<i64> = summary.visits.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![1_000, 2_000]);
        assert_eq!(summary.visits[0].navigation_path, vec!["/early".to_string()]);
        assert_eq!(summary.visits[0].page_views, earlier["pageViews"]);
        assert_eq!(summary.visits[0].page_views[0]["scrollDepth"], json!(80));
    }

    #[test]
    fn empty_user_agent_is_unknown_device() {
        let parser = woothee::parser::Parser::new();
        assert_eq!(device_type(&parser, ""), "unknown");
        assert_eq!(device_type(&parser, IPHONE), "mobile");
        assert_eq!(device_type(&parser, WINDOWS_CHROME), "desktop");
    }
}
