//! History record model.

use chrono::{Local, NaiveDateTime};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::MediaType;

/// Timestamp layout used for persistence and reports (ISO-8601, microseconds).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// One processed upload.
///
/// Records are created once per accepted upload and never change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HistoryRecord {
    /// Local wall-clock time the upload finished processing
    pub timestamp: NaiveDateTime,
    /// Target-class count (maximum per frame for videos)
    pub count: u32,
    pub media_type: MediaType,
    /// Path of the annotated output file
    pub result_path: String,
}

impl HistoryRecord {
    /// Create a record stamped with the current local time.
    pub fn now(count: u32, media_type: MediaType, result_path: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now().naive_local(),
            count,
            media_type,
            result_path: result_path.into(),
        }
    }

    /// Timestamp rendered in the persisted ISO-8601 layout.
    pub fn timestamp_iso(&self) -> String {
        format_timestamp(&self.timestamp)
    }
}

/// Render a timestamp in the persisted layout.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a persisted timestamp.
///
/// Accepts any fractional precision, including none.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, TimestampParseError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|_| TimestampParseError(s.to_string()))
}

#[derive(Debug, Error)]
#[error("Invalid timestamp: {0}")]
pub struct TimestampParseError(String);
