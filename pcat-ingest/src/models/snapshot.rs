//! Immutable views handed to subscribers

use super::{ProgressState, ResultSet, SessionState};
use crate::error::IngestError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Point-in-time copy of buckets and progress
///
/// `buckets` is shared, never mutated after publication: the session copies
/// its working set before every publish.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub session_id: Uuid,
    pub state: SessionState,
    pub buckets: Arc<ResultSet>,
    pub progress: ProgressState,
    pub taken_at: DateTime<Utc>,
}

/// Notification delivered to subscribers
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    /// Buckets after a fully processed chunk, a total update, or completion
    Snapshot(Arc<Snapshot>),
    /// Terminal error, delivered once
    Failed(IngestError),
}

impl SessionUpdate {
    /// Whether no further updates follow this one
    pub fn is_terminal(&self) -> bool {
        match self {
            SessionUpdate::Snapshot(snapshot) => snapshot.state.is_terminal(),
            SessionUpdate::Failed(_) => true,
        }
    }
}
