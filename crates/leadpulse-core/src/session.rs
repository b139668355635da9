use serde::{Deserialize, Serialize};

/// One browser page-load's recorded telemetry.
///
/// This is the body of `POST /sites/{siteId}/analytics` and the content of
/// every persisted session record. Every field is required; the recorder
/// sends zero values (empty arrays, empty strings) rather than omitting them.
///
/// `navigation_path[i]` normally mirrors `page_views[i].path`, but the two are
/// appended independently and may diverge if recording is interrupted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Session {
    pub site_id: String,
    /// Epoch milliseconds. Doubles as the session identifier in aggregates.
    pub start_time: i64,
    pub last_active: i64,
    pub device_info: DeviceInfo,
    pub page_views: Vec<PageView>,
    pub clicks: Vec<ClickEvent>,
    pub navigation_path: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeviceInfo {
    /// The snippet records the raw user agent here.
    pub browser: String,
    pub os: String,
    pub screen_size: ScreenSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PageView {
    pub path: String,
    pub timestamp: i64,
    /// Milliseconds since the page view opened, frozen at unload.
    pub time_spent: i64,
    /// Maximum scroll percentage reached, 0–100.
    pub scroll_depth: f64,
    pub device_info: DeviceInfo,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Location {
    pub country: String,
    pub region: String,
}

impl Location {
    pub fn unknown() -> Self {
        Self {
            country: "Unknown".to_string(),
            region: "Unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClickEvent {
    pub path: String,
    pub timestamp: i64,
    pub element_id: String,
    pub element_text: String,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// The body of `POST /sites/{siteId}/visits`.
///
/// `session_start_time` is the explicit join key to the session recorded at
/// the same unload. Older snippets omit it; such visits never correlate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VisitReport {
    /// Seconds.
    pub duration: f64,
    /// Referrer URL, or `"direct"`.
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_start_time: Option<i64>,
}

/// A session that passed schema validation.
///
/// `raw` is the payload exactly as received and is what gets persisted;
/// `session` is the typed view of the same data.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSession {
    pub raw: serde_json::Value,
    pub session: Session,
}
