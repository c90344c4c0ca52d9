//! Progress tracking against the independently fetched total

use crate::models::{ProgressState, ResultSet};

/// Derives the processed count from the buckets
///
/// The count is recomputed from bucket lengths on every update, so it can
/// never drift from the buckets themselves.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    state: ProgressState,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute `processed` as the sum of bucket lengths
    pub fn recompute(&mut self, buckets: &ResultSet) -> u64 {
        self.state.processed = buckets.total_tracks() as u64;
        self.state.processed
    }

    /// Record the expected total; may arrive at any point
    pub fn set_total(&mut self, total: u64) {
        self.state.total_expected = Some(total);
    }

    pub fn state(&self) -> ProgressState {
        self.state
    }

    pub fn percentage(&self) -> Option<u8> {
        self.state.percentage()
    }
}
