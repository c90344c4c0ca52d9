//! Progress state published with every snapshot

use serde::{Deserialize, Serialize};

/// Processed count against the independently fetched total
///
/// `processed` is always derived from the buckets, never counted separately.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    /// Total tracks expected, `None` until the total fetch answers
    pub total_expected: Option<u64>,

    /// Records routed so far (sum of bucket lengths)
    pub processed: u64,
}

impl ProgressState {
    /// Percentage complete, rounded and clamped to 0-100
    ///
    /// `None` while the total is unknown. A known total of zero reports 100.
    pub fn percentage(&self) -> Option<u8> {
        let total = self.total_expected?;
        if total == 0 {
            return Some(100);
        }
        let pct = (self.processed as f64 / total as f64 * 100.0).round();
        Some(pct.clamp(0.0, 100.0) as u8)
    }
}
