//! Track record as emitted by the categorization stream

use serde::{Deserialize, Serialize};

/// One categorized track
///
/// `category_name` is raw: it still carries whatever emphasis markers the
/// producer emitted. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub track_name: String,

    #[serde(default)]
    pub artists: Vec<String>,

    pub album: String,

    pub release_date: String,

    /// Why the producer chose this category
    pub reasoning: String,

    pub category_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_number: Option<u32>,

    /// Album art, when the playlist entry has any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl TrackRecord {
    /// Artists joined for display
    pub fn artists_display(&self) -> String {
        self.artists.join(", ")
    }
}
