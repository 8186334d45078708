//! Core types for the engagement analytics library
//!
//! This module defines the fundamental values every other module passes around:
//! record identifiers, loosely-typed records as they arrive from the loader
//! document, and the error type. Records are never mutated after load - every
//! accessor here is a read-only, tolerant view over the raw attributes.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Timestamp type used throughout the library
pub type Timestamp = DateTime<Utc>;

/// Integer identifier of a record within its table
pub type EntityId = i64;

/// Result type for loading operations
pub type Result<T> = std::result::Result<T, InsightsError>;

/// Errors that can occur while loading a snapshot
///
/// Filtering, relation lookups and aggregation never fail; only turning a
/// document into a [`Snapshot`](crate::Snapshot) can.
#[derive(Debug, thiserror::Error)]
pub enum InsightsError {
    #[error("Failed to parse snapshot document: {0}")]
    DocumentParse(#[from] serde_json::Error),

    #[error("Invalid snapshot document: {0}")]
    InvalidDocument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single row of an entity table
///
/// Holds the integer id plus every other attribute exactly as the loader
/// delivered it. Typed accessors map missing or malformed values to `None`
/// instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique id within the owning table
    pub id: EntityId,
    /// All remaining attributes, untouched
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Record {
    /// Build a record from a raw JSON object
    ///
    /// Returns `None` when the value is not an object or has no integer `id`.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut attributes) = value else {
            return None;
        };
        let id = attributes.remove("id").as_ref().and_then(integer)?;
        Some(Self { id, attributes })
    }

    /// Raw attribute value, `None` when missing or JSON `null`
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name).filter(|v| !v.is_null())
    }

    /// String attribute
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Boolean attribute (only real JSON booleans count)
    pub fn flag(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    /// Numeric attribute; numeric strings such as `"4"` are accepted
    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(numeric)
    }

    /// Timestamp attribute parsed from RFC 3339 or a naive date/datetime
    pub fn timestamp(&self, name: &str) -> Option<Timestamp> {
        self.text(name).and_then(parse_timestamp)
    }

    /// Calendar date attribute (a bare date, or the date part of a datetime)
    pub fn date(&self, name: &str) -> Option<NaiveDate> {
        self.text(name).and_then(parse_date)
    }

    /// True if the publication timestamp attribute is present and non-null
    pub fn is_published(&self) -> bool {
        self.get(crate::schema::attr::PUBLISHED_AT).is_some()
    }
}

/// Integer value of a JSON number or numeric string
pub(crate) fn integer(value: &Value) -> Option<EntityId> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Finite float value of a JSON number or numeric string
pub(crate) fn numeric(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// Parse a timestamp string
///
/// Accepts RFC 3339 (`2025-01-01T10:00:00.000Z`), naive datetimes with `T` or
/// space separators (read as UTC) and bare dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parse a calendar date string, keeping the written date of datetimes
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}
