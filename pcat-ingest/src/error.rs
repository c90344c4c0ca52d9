//! Error types for pcat-ingest
//!
//! Two groups of errors:
//! - Terminal: end the session in `Failed` and are surfaced to subscribers once
//! - Recovered: handled in place during ingestion, logged, never surfaced

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Categorized ingestion error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    /// No access token available, session never starts
    #[error("No access token found")]
    MissingCredential,

    /// Empty category list, session never starts
    #[error("No categories available for categorization")]
    MissingCategories,

    /// Network or connection failure, including stream inactivity
    #[error("Transport error: {0}")]
    Transport(String),

    /// Backend answered with a non-success status
    #[error("Upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    /// A scanned object failed to parse as a track record
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// A record's sanitized category matched no bucket
    #[error("Unknown category: {0}")]
    UnknownCategory(String),
}

/// Error kind, for matching without payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    MissingCredential,
    MissingCategories,
    TransportError,
    UpstreamError,
    MalformedRecord,
    UnknownCategory,
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::MissingCredential => ErrorKind::MissingCredential,
            IngestError::MissingCategories => ErrorKind::MissingCategories,
            IngestError::Transport(_) => ErrorKind::TransportError,
            IngestError::Upstream { .. } => ErrorKind::UpstreamError,
            IngestError::MalformedRecord(_) => ErrorKind::MalformedRecord,
            IngestError::UnknownCategory(_) => ErrorKind::UnknownCategory,
        }
    }

    /// Recovered errors never halt ingestion
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            IngestError::MalformedRecord(_) | IngestError::UnknownCategory(_)
        )
    }

    /// Inactivity timeout, reported as a transport failure
    pub fn inactivity(after: Duration) -> Self {
        IngestError::Transport(format!("no data received for {}s", after.as_secs_f64()))
    }
}

impl From<reqwest::Error> for IngestError {
    fn from(err: reqwest::Error) -> Self {
        IngestError::Transport(err.to_string())
    }
}

/// Result type for ingestion operations
pub type IngestResult<T> = Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_kinds() {
        assert!(IngestError::MalformedRecord("x".into()).is_recoverable());
        assert!(IngestError::UnknownCategory("x".into()).is_recoverable());
        assert!(!IngestError::MissingCredential.is_recoverable());
        assert!(!IngestError::MissingCategories.is_recoverable());
        assert!(!IngestError::Transport("reset".into()).is_recoverable());
        assert!(!IngestError::Upstream {
            status: 500,
            message: "boom".into()
        }
        .is_recoverable());
    }

    #[test]
    fn test_inactivity_is_transport() {
        let err = IngestError::inactivity(Duration::from_secs(5));
        assert_eq!(err.kind(), ErrorKind::TransportError);
        assert_eq!(err.to_string(), "Transport error: no data received for 5s");
    }

    #[test]
    fn test_upstream_message_display() {
        let err = IngestError::Upstream {
            status: 400,
            message: "Unable to generate results".into(),
        };
        assert_eq!(err.to_string(), "Upstream error (400): Unable to generate results");
    }
}
