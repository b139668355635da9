//! Structural validation of inbound JSON payloads.
//!
//! Payloads are checked as raw [`serde_json::Value`]s so that every problem is
//! reported at once, each with the dotted path of the offending field
//! (`pageViews[0].scrollDepth`). Only a payload with zero violations is
//! converted to its typed form.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::session::{Session, ValidatedSession, VisitReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCode {
    Required,
    InvalidType,
    UnknownField,
    OutOfRange,
    InvalidValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub code: ViolationCode,
    pub message: String,
}

const ROOT: &str = "body";

pub fn field_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

pub fn index_path(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Accumulates [`FieldViolation`]s while walking a payload.
#[derive(Debug, Default)]
pub struct Validator {
    violations: Vec<FieldViolation>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn violate(
        &mut self,
        field: impl Into<String>,
        code: ViolationCode,
        message: impl Into<String>,
    ) {
        let field = field.into();
        self.violations.push(FieldViolation {
            field: if field.is_empty() {
                ROOT.to_string()
            } else {
                field
            },
            code,
            message: message.into(),
        });
    }

    pub fn finish(self) -> Result<(), Vec<FieldViolation>> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(self.violations)
        }
    }

    fn invalid_type(&mut self, field: &str, expected: &str, value: &Value) {
        self.violate(
            field,
            ViolationCode::InvalidType,
            format!("expected {expected}, received {}", type_name(value)),
        );
    }

    /// `value` must be an object; keys outside `allowed` are violations.
    pub fn object<'v>(
        &mut self,
        path: &str,
        value: &'v Value,
        allowed: &[&str],
    ) -> Option<&'v Map<String, Value>> {
        let Some(map) = value.as_object() else {
            self.invalid_type(path, "object", value);
            return None;
        };
        for key in map.keys() {
            if !allowed.contains(&key.as_str()) {
                self.violate(
                    field_path(path, key),
                    ViolationCode::UnknownField,
                    format!("unrecognized field `{key}`"),
                );
            }
        }
        Some(map)
    }

    /// Look up a field that must be present. `null` counts as present and is
    /// rejected later by the type check.
    pub fn required<'v>(
        &mut self,
        map: &'v Map<String, Value>,
        path: &str,
        key: &str,
    ) -> Option<(String, &'v Value)> {
        let field = field_path(path, key);
        match map.get(key) {
            Some(value) => Some((field, value)),
            None => {
                self.violate(field, ViolationCode::Required, "required");
                None
            }
        }
    }

    fn optional<'v>(
        map: &'v Map<String, Value>,
        path: &str,
        key: &str,
    ) -> Option<(String, &'v Value)> {
        match map.get(key) {
            None | Some(Value::Null) => None,
            Some(value) => Some((field_path(path, key), value)),
        }
    }

    pub fn expect_string<'v>(&mut self, field: &str, value: &'v Value) -> Option<&'v str> {
        match value {
            Value::String(s) => Some(s.as_str()),
            other => {
                self.invalid_type(field, "string", other);
                None
            }
        }
    }

    pub fn expect_integer(&mut self, field: &str, value: &Value) -> Option<i64> {
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(i),
                None if n.is_u64() => {
                    self.violate(field, ViolationCode::OutOfRange, "integer out of range");
                    None
                }
                None => {
                    self.violate(
                        field,
                        ViolationCode::InvalidType,
                        "expected integer, received fractional number",
                    );
                    None
                }
            },
            other => {
                self.invalid_type(field, "integer", other);
                None
            }
        }
    }

    pub fn expect_unsigned(&mut self, field: &str, value: &Value) -> Option<u32> {
        let n = self.expect_integer(field, value)?;
        match u32::try_from(n) {
            Ok(n) => Some(n),
            Err(_) => {
                self.violate(
                    field,
                    ViolationCode::OutOfRange,
                    format!("must be between 0 and {}", u32::MAX),
                );
                None
            }
        }
    }

    pub fn expect_number(&mut self, field: &str, value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            other => {
                self.invalid_type(field, "number", other);
                None
            }
        }
    }

    pub fn expect_bool(&mut self, field: &str, value: &Value) -> Option<bool> {
        match value {
            Value::Bool(b) => Some(*b),
            other => {
                self.invalid_type(field, "boolean", other);
                None
            }
        }
    }

    pub fn expect_array<'v>(&mut self, field: &str, value: &'v Value) -> Option<&'v [Value]> {
        match value {
            Value::Array(items) => Some(items.as_slice()),
            other => {
                self.invalid_type(field, "array", other);
                None
            }
        }
    }

    pub fn string<'v>(
        &mut self,
        map: &'v Map<String, Value>,
        path: &str,
        key: &str,
    ) -> Option<&'v str> {
        let (field, value) = self.required(map, path, key)?;
        self.expect_string(&field, value)
    }

    pub fn integer(&mut self, map: &Map<String, Value>, path: &str, key: &str) -> Option<i64> {
        let (field, value) = self.required(map, path, key)?;
        self.expect_integer(&field, value)
    }

    pub fn unsigned(&mut self, map: &Map<String, Value>, path: &str, key: &str) -> Option<u32> {
        let (field, value) = self.required(map, path, key)?;
        self.expect_unsigned(&field, value)
    }

    pub fn number(&mut self, map: &Map<String, Value>, path: &str, key: &str) -> Option<f64> {
        let (field, value) = self.required(map, path, key)?;
        self.expect_number(&field, value)
    }

    pub fn array<'v>(
        &mut self,
        map: &'v Map<String, Value>,
        path: &str,
        key: &str,
    ) -> Option<(String, &'v [Value])> {
        let (field, value) = self.required(map, path, key)?;
        let items = self.expect_array(&field, value)?;
        Some((field, items))
    }

    pub fn optional_string<'v>(
        &mut self,
        map: &'v Map<String, Value>,
        path: &str,
        key: &str,
    ) -> Option<&'v str> {
        let (field, value) = Self::optional(map, path, key)?;
        self.expect_string(&field, value)
    }

    pub fn optional_integer(
        &mut self,
        map: &Map<String, Value>,
        path: &str,
        key: &str,
    ) -> Option<i64> {
        let (field, value) = Self::optional(map, path, key)?;
        self.expect_integer(&field, value)
    }

    pub fn optional_number(
        &mut self,
        map: &Map<String, Value>,
        path: &str,
        key: &str,
    ) -> Option<f64> {
        let (field, value) = Self::optional(map, path, key)?;
        self.expect_number(&field, value)
    }

    pub fn optional_bool(&mut self, map: &Map<String, Value>, path: &str, key: &str) -> Option<bool> {
        let (field, value) = Self::optional(map, path, key)?;
        self.expect_bool(&field, value)
    }
}

/// Site ids become part of session file names, so anything that could escape
/// the storage directory or truncate the name is refused.
pub fn is_valid_site_id(site_id: &str) -> bool {
    !site_id.is_empty()
        && !site_id.contains("..")
        && !site_id.contains(['/', '\\', '\0'])
}

const SESSION_FIELDS: &[&str] = &[
    "siteId",
    "startTime",
    "lastActive",
    "deviceInfo",
    "pageViews",
    "clicks",
    "navigationPath",
];
const DEVICE_INFO_FIELDS: &[&str] = &["browser", "os", "screenSize"];
const SCREEN_SIZE_FIELDS: &[&str] = &["width", "height"];
const PAGE_VIEW_FIELDS: &[&str] = &[
    "path",
    "timestamp",
    "timeSpent",
    "scrollDepth",
    "deviceInfo",
    "location",
];
const LOCATION_FIELDS: &[&str] = &["country", "region"];
const CLICK_FIELDS: &[&str] = &["path", "timestamp", "elementId", "elementText", "position"];
const POSITION_FIELDS: &[&str] = &["x", "y"];

/// Validate a session payload and hand back both the untouched JSON and its
/// typed view.
pub fn validate_session(value: serde_json::Value) -> Result<ValidatedSession, Vec<FieldViolation>> {
    let mut v = Validator::new();
    check_session(&mut v, &value);
    v.finish()?;

    match serde_json::from_value::<Session>(value.clone()) {
        Ok(session) => Ok(ValidatedSession {
            raw: value,
            session,
        }),
        Err(e) => Err(vec![FieldViolation {
            field: ROOT.to_string(),
            code: ViolationCode::InvalidValue,
            message: e.to_string(),
        }]),
    }
}

fn check_session(v: &mut Validator, value: &Value) {
    let Some(map) = v.object("", value, SESSION_FIELDS) else {
        return;
    };
    v.string(map, "", "siteId");
    v.integer(map, "", "startTime");
    v.integer(map, "", "lastActive");
    if let Some((field, info)) = v.required(map, "", "deviceInfo") {
        check_device_info(v, &field, info);
    }
    if let Some((field, items)) = v.array(map, "", "pageViews") {
        for (i, item) in items.iter().enumerate() {
            check_page_view(v, &index_path(&field, i), item);
        }
    }
    if let Some((field, items)) = v.array(map, "", "clicks") {
        for (i, item) in items.iter().enumerate() {
            check_click(v, &index_path(&field, i), item);
        }
    }
    if let Some((field, items)) = v.array(map, "", "navigationPath") {
        for (i, item) in items.iter().enumerate() {
            v.expect_string(&index_path(&field, i), item);
        }
    }
}

fn check_device_info(v: &mut Validator, path: &str, value: &Value) {
    let Some(map) = v.object(path, value, DEVICE_INFO_FIELDS) else {
        return;
    };
    v.string(map, path, "browser");
    v.string(map, path, "os");
    if let Some((field, size)) = v.required(map, path, "screenSize") {
        if let Some(size) = v.object(&field, size, SCREEN_SIZE_FIELDS) {
            v.unsigned(size, &field, "width");
            v.unsigned(size, &field, "height");
        }
    }
}

fn check_page_view(v: &mut Validator, path: &str, value: &Value) {
    let Some(map) = v.object(path, value, PAGE_VIEW_FIELDS) else {
        return;
    };
    v.string(map, path, "path");
    v.integer(map, path, "timestamp");
    if v.integer(map, path, "timeSpent").is_some_and(|ms| ms < 0) {
        v.violate(
            field_path(path, "timeSpent"),
            ViolationCode::OutOfRange,
            "timeSpent must not be negative",
        );
    }
    v.number(map, path, "scrollDepth");
    if let Some((field, info)) = v.required(map, path, "deviceInfo") {
        check_device_info(v, &field, info);
    }
    if let Some((field, location)) = v.required(map, path, "location") {
        if let Some(location) = v.object(&field, location, LOCATION_FIELDS) {
            v.string(location, &field, "country");
            v.string(location, &field, "region");
        }
    }
}

fn check_click(v: &mut Validator, path: &str, value: &Value) {
    let Some(map) = v.object(path, value, CLICK_FIELDS) else {
        return;
    };
    v.string(map, path, "path");
    v.integer(map, path, "timestamp");
    v.string(map, path, "elementId");
    v.string(map, path, "elementText");
    if let Some((field, position)) = v.required(map, path, "position") {
        if let Some(position) = v.object(&field, position, POSITION_FIELDS) {
            v.number(position, &field, "x");
            v.number(position, &field, "y");
        }
    }
}

const VISIT_FIELDS: &[&str] = &["duration", "source", "sessionStartTime"];

/// Validate a visit-duration payload. `duration` is seconds and must not be
/// negative; `sessionStartTime` may be absent or `null`.
pub fn validate_visit(value: &Value) -> Result<VisitReport, Vec<FieldViolation>> {
    let mut v = Validator::new();
    let mut report = None;
    if let Some(map) = v.object("", value, VISIT_FIELDS) {
        let duration = v.number(map, "", "duration");
        if duration.is_some_and(|d| d < 0.0) {
            v.violate(
                "duration",
                ViolationCode::OutOfRange,
                "duration must not be negative",
            );
        }
        let source = v.string(map, "", "source");
        let session_start_time = v.optional_integer(map, "", "sessionStartTime");
        if let (Some(duration), Some(source)) = (duration, source) {
            report = Some(VisitReport {
                duration,
                source: source.to_string(),
                session_start_time,
            });
        }
    }
    v.finish()?;
    report.ok_or_else(|| {
        vec![FieldViolation {
            field: ROOT.to_string(),
            code: ViolationCode::InvalidValue,
            message: "visit payload is incomplete".to_string(),
        }]
    })
}
