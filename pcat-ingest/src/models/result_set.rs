//! Result set: one ordered bucket per category
//!
//! Buckets are created up front, one per distinct sanitized category name,
//! so an empty bucket means "nothing routed here yet" rather than "unknown".
//! Bucket order follows the order categories were supplied in.

use super::{Category, TrackRecord};
use serde::Serialize;
use tracing::warn;

/// Tracks belonging to one category, in arrival order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    /// Sanitized category name
    pub key: String,
    pub category: Category,
    pub tracks: Vec<TrackRecord>,
}

impl Bucket {
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Mapping from sanitized category name to its bucket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultSet {
    buckets: Vec<Bucket>,
}

impl ResultSet {
    /// Pre-create one empty bucket per category
    ///
    /// Categories whose sanitized names collide with an earlier one are
    /// dropped so every key maps to exactly one category.
    pub fn from_categories(categories: &[Category]) -> Self {
        let mut buckets: Vec<Bucket> = Vec::with_capacity(categories.len());
        for category in categories {
            let key = category.key();
            if buckets.iter().any(|b| b.key == key) {
                warn!(
                    category = %category.name,
                    key = %key,
                    "Duplicate category after sanitization, keeping the first"
                );
                continue;
            }
            buckets.push(Bucket {
                key,
                category: category.clone(),
                tracks: Vec::new(),
            });
        }
        Self { buckets }
    }

    pub fn get(&self, key: &str) -> Option<&Bucket> {
        self.buckets.iter().find(|b| b.key == key)
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut Bucket> {
        self.buckets.iter_mut().find(|b| b.key == key)
    }

    /// Tracks in a bucket, `None` when the key is unknown
    pub fn tracks(&self, key: &str) -> Option<&[TrackRecord]> {
        self.get(key).map(|b| b.tracks.as_slice())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.buckets.iter().map(|b| b.key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bucket> {
        self.buckets.iter()
    }

    /// Number of buckets
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Sum of all bucket lengths
    pub fn total_tracks(&self) -> usize {
        self.buckets.iter().map(Bucket::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets_precreated_in_order() {
        let set = ResultSet::from_categories(&[
            Category::new("**Chill**", "d1"),
            Category::new("Energetic", "d2"),
        ]);
        assert_eq!(set.keys().collect::<Vec<_>>(), vec!["Chill", "Energetic"]);
        assert_eq!(set.tracks("Chill"), Some(&[][..]));
        assert!(set.tracks("Unknown").is_none());
        assert_eq!(set.total_tracks(), 0);
    }

    #[test]
    fn test_colliding_sanitized_names_keep_first() {
        let set = ResultSet::from_categories(&[
            Category::new("Chill", "first"),
            Category::new("*Chill*", "second"),
        ]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("Chill").unwrap().category.description, "first");
    }
}
