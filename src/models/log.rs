//! Candidate log records as submitted by clients, and their coercion into
//! validated rows ready for insertion.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sea_orm::entity::prelude::DateTimeUtc;
use serde::Deserialize;
use thiserror::Error;

/// Why a submitted record could not be turned into a [`NewLog`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("Missing required field: level")]
    MissingLevel,

    #[error("Missing required field: message")]
    MissingMessage,

    #[error("Missing required field: timestamp")]
    MissingTimestamp,

    #[error("Unparseable timestamp: {0}")]
    UnparseableTimestamp(String),
}

/// A log record as it arrives over the wire. Required fields are modeled as
/// `Option` so presence is checked here rather than by the deserializer,
/// keeping the failure mode a 400 with a useful message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    pub level: Option<String>,
    pub message: Option<String>,
    pub resource_id: Option<String>,
    pub timestamp: Option<String>,
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub commit: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// A validated record ready to be persisted. Optional identifiers are never
/// empty strings, and the timestamp has been coerced to UTC.
#[derive(Debug, Clone)]
pub struct NewLog {
    pub level: String,
    pub message: String,
    pub resource_id: Option<String>,
    pub timestamp: DateTimeUtc,
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub commit: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl CandidateRecord {
    /// Validates required fields and normalizes the rest. Empty strings count
    /// as absent, for required and optional fields alike.
    pub fn into_new_log(self) -> Result<NewLog, RecordError> {
        let level = normalized(self.level).ok_or(RecordError::MissingLevel)?;
        let message = normalized(self.message).ok_or(RecordError::MissingMessage)?;
        let raw_timestamp = normalized(self.timestamp).ok_or(RecordError::MissingTimestamp)?;
        let timestamp = parse_timestamp(&raw_timestamp)
            .ok_or_else(|| RecordError::UnparseableTimestamp(raw_timestamp))?;

        Ok(NewLog {
            level,
            message,
            resource_id: normalized(self.resource_id),
            timestamp,
            trace_id: normalized(self.trace_id),
            span_id: normalized(self.span_id),
            commit: normalized(self.commit),
            metadata: self.metadata,
        })
    }
}

/// Maps absent or empty strings to `None` so optional columns are stored as
/// NULL, never as empty text.
pub fn normalized(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Lenient timestamp coercion: RFC 3339 first, then common naive formats
/// interpreted as UTC, then a bare date at midnight.
pub fn parse_timestamp(raw: &str) -> Option<DateTimeUtc> {
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
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn candidate() -> CandidateRecord {
        CandidateRecord {
            level: Some("error".to_string()),
            message: Some("db down".to_string()),
            resource_id: Some("server-1".to_string()),
            timestamp: Some("2024-01-01T10:00:00Z".to_string()),
            trace_id: None,
            span_id: None,
            commit: None,
            metadata: None,
        }
    }

    #[test]
    fn valid_record_coerces() {
        let log = candidate().into_new_log().unwrap();
        assert_eq!(log.level, "error");
        assert_eq!(log.message, "db down");
        assert_eq!(log.resource_id.as_deref(), Some("server-1"));
        assert_eq!(log.timestamp, Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn missing_required_fields_are_rejected() {
        let mut record = candidate();
        record.level = None;
        assert_eq!(record.into_new_log().unwrap_err(), RecordError::MissingLevel);

        let mut record = candidate();
        record.message = Some(String::new());
        assert_eq!(record.into_new_log().unwrap_err(), RecordError::MissingMessage);

        let mut record = candidate();
        record.timestamp = None;
        assert_eq!(
            record.into_new_log().unwrap_err(),
            RecordError::MissingTimestamp
        );
    }

    #[test]
    fn unparseable_timestamp_is_rejected() {
        let mut record = candidate();
        record.timestamp = Some("not a date".to_string());
        assert_eq!(
            record.into_new_log().unwrap_err(),
            RecordError::UnparseableTimestamp("not a date".to_string())
        );
    }

    #[test]
    fn empty_optionals_become_null() {
        let mut record = candidate();
        record.resource_id = Some(String::new());
        record.trace_id = Some(String::new());
        let log = record.into_new_log().unwrap();
        assert_eq!(log.resource_id, None);
        assert_eq!(log.trace_id, None);
    }

    #[test]
    fn metadata_passes_through_opaquely() {
        let mut record = candidate();
        record.metadata = Some(serde_json::json!({"parentResourceId": "server-0987"}));
        let log = record.into_new_log().unwrap();
        assert_eq!(
            log.metadata,
            Some(serde_json::json!({"parentResourceId": "server-0987"}))
        );
    }

    #[test]
    fn timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-01T10:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01T12:00:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01T10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01 10:00:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-01-01"),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
