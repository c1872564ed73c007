//! Wire models for cluster REST responses
//!
//! Deserialization targets for the handful of search, count, snapshot,
//! and health endpoints the facade touches. Only the fields we read are
//! declared; everything else in the response is ignored.

use crate::domain::{ClusterError, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

/// Envelope of a `_search` response
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub hits: SearchHits,
}

#[derive(Debug, Deserialize)]
pub struct SearchHits {
    pub hits: Vec<SearchHit>,
}

/// One hit; the source document is kept dynamic because the timestamp
/// field name is configuration-driven
#[derive(Debug, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "_source")]
    pub source: Value,
}

/// Envelope of a `_count` response
#[derive(Debug, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

/// Envelope of a `_cluster/health` response
#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub cluster_name: String,
    pub status: String,
}

/// Envelope of a `_snapshot/<repo>/_all` response
#[derive(Debug, Deserialize)]
pub struct SnapshotListResponse {
    pub snapshots: Vec<SnapshotEntry>,
}

/// One snapshot in the repository listing
#[derive(Debug, Deserialize)]
pub struct SnapshotEntry {
    pub snapshot: String,
    pub state: String,
    #[serde(default)]
    pub start_time_in_millis: i64,
}

impl SnapshotEntry {
    /// Whether this snapshot completed successfully
    pub fn is_success(&self) -> bool {
        self.state == "SUCCESS"
    }
}

/// Extract and parse the timestamp field from a hit's source document
///
/// Date fields come back either as ISO-8601 strings or as epoch
/// milliseconds depending on the index mapping; both are accepted.
///
/// # Errors
///
/// Returns [`ClusterError::InvalidResponse`] when the field is missing or
/// holds a value that cannot be read as a timestamp.
pub fn timestamp_from_source(source: &Value, field: &str) -> Result<DateTime<Utc>> {
    let value = source.get(field).ok_or_else(|| {
        ClusterError::InvalidResponse(format!("hit source is missing field '{field}'"))
    })?;

    parse_timestamp_value(value).ok_or_else(|| {
        ClusterError::InvalidResponse(format!(
            "field '{field}' holds unparseable timestamp: {value}"
        ))
        .into()
    })
}

fn parse_timestamp_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_timestamp_from_rfc3339_string() {
        let source = json!({ "@timestamp": "2024-03-01T12:30:00Z" });

        let ts = timestamp_from_source(&source, "@timestamp").unwrap();

        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap());
    }

    #[test]
    fn test_timestamp_from_offset_string() {
        let source = json!({ "@timestamp": "2024-03-01T12:30:00+02:00" });

        let ts = timestamp_from_source(&source, "@timestamp").unwrap();

        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_timestamp_from_epoch_millis() {
        let source = json!({ "event_time": 1_709_296_200_000i64 });

        let ts = timestamp_from_source(&source, "event_time").unwrap();

        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap());
    }

    #[test]
    fn test_missing_field_is_invalid_response() {
        let source = json!({ "other": 1 });

        let err = timestamp_from_source(&source, "@timestamp").unwrap_err();

        assert!(err.to_string().contains("missing field"));
    }

    #[test]
    fn test_garbage_value_is_invalid_response() {
        let source = json!({ "@timestamp": ["not", "a", "date"] });

        assert!(timestamp_from_source(&source, "@timestamp").is_err());
    }

    #[test]
    fn test_search_response_deserializes() {
        let body = r#"{
            "took": 3,
            "hits": {
                "total": { "value": 1200, "relation": "eq" },
                "hits": [
                    { "_index": "logs-2024.03", "_source": { "@timestamp": "2024-03-01T00:00:00Z" } }
                ]
            }
        }"#;

        let response: SearchResponse = serde_json::from_str(body).unwrap();

        assert_eq!(response.hits.hits.len(), 1);
    }

    #[test]
    fn test_snapshot_entry_success_filter() {
        let body = r#"{
            "snapshots": [
                { "snapshot": "nightly-1", "state": "SUCCESS", "start_time_in_millis": 1709251200000 },
                { "snapshot": "nightly-2", "state": "IN_PROGRESS", "start_time_in_millis": 1709337600000 }
            ]
        }"#;

        let listing: SnapshotListResponse = serde_json::from_str(body).unwrap();

        assert!(listing.snapshots[0].is_success());
        assert!(!listing.snapshots[1].is_success());
    }
}
