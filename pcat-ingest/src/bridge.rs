//! Terminal presentation of session snapshots
//!
//! Keeps the active category tab and renders a snapshot as plain text. Holds
//! no session state of its own: every render works from the snapshot passed in.

use crate::error::IngestError;
use crate::models::{Bucket, ProgressState, Snapshot};
use crate::router::sanitize;
use std::fmt::Write;
use tracing::debug;

/// Active-tab selection plus text rendering
#[derive(Debug, Clone, Default)]
pub struct TerminalBridge {
    /// Last selection that matched a bucket
    active_tab: Option<String>,
    /// Selection not yet checked against a snapshot
    requested_tab: Option<String>,
}

impl TerminalBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a tab by category name (markers are ignored)
    ///
    /// Checked against the buckets on the next render; an unknown name is
    /// ignored and the previous tab stays active.
    pub fn select_tab(&mut self, name: &str) {
        self.requested_tab = Some(sanitize(name));
    }

    fn apply_selection(&mut self, snapshot: &Snapshot) {
        let Some(requested) = self.requested_tab.take() else {
            return;
        };
        if snapshot.buckets.contains_key(&requested) {
            self.active_tab = Some(requested);
        } else {
            debug!(tab = %requested, "Ignoring selection of unknown tab");
        }
    }

    /// Active bucket, the first bucket until a known tab has been selected
    pub fn active_bucket<'a>(&self, snapshot: &'a Snapshot) -> Option<&'a Bucket> {
        self.active_tab
            .as_deref()
            .and_then(|key| snapshot.buckets.get(key))
            .or_else(|| snapshot.buckets.iter().next())
    }

    pub fn render(&mut self, snapshot: &Snapshot) -> String {
        self.apply_selection(snapshot);
        let mut out = String::new();
        let active = self.active_bucket(snapshot).map(|b| b.key.as_str());

        let tabs: Vec<String> = snapshot
            .buckets
            .iter()
            .map(|bucket| {
                if Some(bucket.key.as_str()) == active {
                    format!("[{} ({})]", bucket.key, bucket.len())
                } else {
                    format!("{} ({})", bucket.key, bucket.len())
                }
            })
            .collect();
        let _ = writeln!(out, "{}", tabs.join("  "));
        let _ = writeln!(out, "{}", progress_line(&snapshot.progress));

        if let Some(bucket) = self.active_bucket(snapshot) {
            let _ = writeln!(out, "{} - {}", bucket.key, bucket.category.description);
            for track in &bucket.tracks {
                let _ = writeln!(out, "  {} - {}", track.track_name, track.artists_display());
                let _ = writeln!(out, "    {}", track.reasoning);
            }
        }
        out
    }

    pub fn render_error(error: &IngestError) -> String {
        format!("Error: {}\n", error)
    }
}

/// `processed/total (pct%)`, or an explicit unknown-total marker
pub fn progress_line(progress: &ProgressState) -> String {
    match (progress.total_expected, progress.percentage()) {
        (Some(total), Some(pct)) => format!("Progress: {}/{} ({}%)", progress.processed, total, pct),
        _ => format!("Progress: {}/? (total unknown)", progress.processed),
    }
}
