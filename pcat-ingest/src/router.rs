//! Record parsing and routing into category buckets

use crate::error::IngestError;
use crate::models::{ResultSet, TrackRecord};

/// Emphasis marker the producer wraps names in
const MARKER: char = '*';

/// Canonical bucket key: the name with every `*` removed
pub fn sanitize(name: &str) -> String {
    name.replace(MARKER, "")
}

/// Result of routing one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Appended to the bucket `key` at `position`
    Routed { key: String, position: usize },
    /// No bucket for the sanitized name; nothing was mutated
    Dropped { unknown_name: String },
}

impl RouteOutcome {
    /// Recoverable error for a dropped record
    pub fn into_error(self) -> Option<IngestError> {
        match self {
            RouteOutcome::Routed { .. } => None,
            RouteOutcome::Dropped { unknown_name } => Some(IngestError::UnknownCategory(unknown_name)),
        }
    }
}

/// Parse one scanned object into a track record
pub fn parse_record(object: &str) -> Result<TrackRecord, IngestError> {
    serde_json::from_str(object).map_err(|e| IngestError::MalformedRecord(e.to_string()))
}

/// Append the record to the bucket matching its sanitized category
///
/// No deduplication: a re-delivered record is appended again.
pub fn route(record: TrackRecord, buckets: &mut ResultSet) -> RouteOutcome {
    let key = sanitize(&record.category_name);
    match buckets.get_mut(&key) {
        Some(bucket) => {
            bucket.tracks.push(record);
            RouteOutcome::Routed {
                position: bucket.tracks.len() - 1,
                key,
            }
        }
        None => RouteOutcome::Dropped { unknown_name: key },
    }
}
