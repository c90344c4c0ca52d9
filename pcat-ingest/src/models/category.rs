//! Category supplied by the caller before a session starts

use serde::{Deserialize, Serialize};

/// A thematic category tracks are sorted into
///
/// Uses the backend's field names (`category_name`) on the wire. Bucket
/// identity is the sanitized name, see [`crate::router::sanitize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Display name, may contain emphasis markers (`**Chill**`)
    #[serde(rename = "category_name")]
    pub name: String,

    /// Description of the common theme
    #[serde(default)]
    pub description: String,

    /// 1-based position assigned by the category generator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_number: Option<u32>,
}

impl Category {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            category_number: None,
        }
    }

    /// Canonical bucket key
    pub fn key(&self) -> String {
        crate::router::sanitize(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_backend_shape() {
        let json = r#"{"category_number": 2, "category_name": "**Indie Folk**", "description": "Acoustic"}"#;
        let category: Category = serde_json::from_str(json).unwrap();
        assert_eq!(category.name, "**Indie Folk**");
        assert_eq!(category.category_number, Some(2));
        assert_eq!(category.key(), "Indie Folk");
    }

    #[test]
    fn test_serialize_round_trips_field_names() {
        let value = serde_json::to_value(Category::new("Chill*", "d1")).unwrap();
        assert_eq!(value["category_name"], "Chill*");
        assert_eq!(value["description"], "d1");
        assert!(value.get("category_number").is_none());
    }
}
