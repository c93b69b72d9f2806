//! Metadata records for crawled images.
//!
//! One `MetadataRecord` is created per API hit, persisted verbatim to the
//! metadata table, read back unchanged by the asset fetcher, and mutated
//! only by the cleaning stage.

use serde::{Deserialize, Serialize};

/// Whether an image is human-made or AI-generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Authentic,
    Ai,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authentic => "authentic",
            Self::Ai => "ai",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "authentic" => Some(Self::Authentic),
            "ai" => Some(Self::Ai),
            _ => None,
        }
    }
}

/// One record returned by the remote API for a single query page.
///
/// Every field is required: a hit missing any of them is a schema
/// violation for that row. Engagement counters are never defaulted.
#[derive(Debug, Clone, Deserialize)]
pub struct RawHit {
    pub id: u64,
    #[serde(rename = "type")]
    pub image_type: String,
    pub tags: String,
    pub views: u64,
    pub downloads: u64,
    pub likes: u64,
    pub comments: u64,
    #[serde(rename = "largeImageURL")]
    pub large_image_url: String,
}

/// One row of the persisted metadata table.
///
/// Serde renames match the on-disk CSV header so tables written by earlier
/// versions of the pipeline stay readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    #[serde(rename = "ID")]
    pub id: u64,
    #[serde(rename = "Content_Type")]
    pub content_type: ContentType,
    #[serde(rename = "Image_Type")]
    pub image_type: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Colors")]
    pub colors: String,
    #[serde(rename = "Editor_Choice")]
    pub editor_choice: String,
    #[serde(rename = "Order")]
    pub order: String,
    #[serde(rename = "Tags")]
    pub tags: String,
    #[serde(rename = "Views")]
    pub views: u64,
    #[serde(rename = "Downloads")]
    pub downloads: u64,
    #[serde(rename = "Likes")]
    pub likes: u64,
    #[serde(rename = "Comments")]
    pub comments: u64,
    #[serde(rename = "URL")]
    pub url: String,
}

/// A metadata row as read back from disk, before validation.
///
/// The persisted table may be hand-edited or sourced independently of the
/// crawler, so every field is optional here. Engagement counters come back
/// as floats because external tools commonly rewrite integer columns that
/// way. Storage resolves columns by header name and treats unparseable
/// cells as missing; the cleaning stage turns these into
/// `MetadataRecord`s.
#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    pub id: Option<u64>,
    pub content_type: Option<String>,
    pub image_type: Option<String>,
    pub category: Option<String>,
    pub colors: Option<String>,
    pub editor_choice: Option<String>,
    pub order: Option<String>,
    pub tags: Option<String>,
    pub views: Option<f64>,
    pub downloads: Option<f64>,
    pub likes: Option<f64>,
    pub comments: Option<f64>,
    pub url: Option<String>,
}

impl RawRecord {
    /// Lossless view of a validated record, for re-cleaning an already
    /// validated table.
    pub fn from_metadata(record: &MetadataRecord) -> Self {
        Self {
            id: Some(record.id),
            content_type: Some(record.content_type.as_str().to_string()),
            image_type: Some(record.image_type.clone()),
            category: Some(record.category.clone()),
            colors: Some(record.colors.clone()),
            editor_choice: Some(record.editor_choice.clone()),
            order: Some(record.order.clone()),
            tags: Some(record.tags.clone()),
            views: Some(record.views as f64),
            downloads: Some(record.downloads as f64),
            likes: Some(record.likes as f64),
            comments: Some(record.comments as f64),
            url: Some(record.url.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_round_trip() {
        assert_eq!(ContentType::parse("authentic"), Some(ContentType::Authentic));
        assert_eq!(ContentType::parse("AI"), Some(ContentType::Ai));
        assert_eq!(ContentType::parse("Unknown"), None);
        assert_eq!(ContentType::Ai.as_str(), "ai");
    }

    #[test]
    fn test_raw_hit_rejects_missing_counter() {
        // A hit without `views` must fail to decode, never default to zero.
        let hit = serde_json::json!({
            "id": 7,
            "type": "photo",
            "tags": "sky, cloud",
            "downloads": 10,
            "likes": 2,
            "comments": 0,
            "largeImageURL": "https://img.example/7.jpg"
        });
        assert!(serde_json::from_value::<RawHit>(hit).is_err());
    }

    #[test]
    fn test_raw_hit_decodes_complete_record() {
        let hit = serde_json::json!({
            "id": 7,
            "type": "vector/ai",
            "tags": "abstract",
            "views": 100,
            "downloads": 10,
            "likes": 2,
            "comments": 1,
            "largeImageURL": "https://img.example/7.jpg"
        });
        let hit: RawHit = serde_json::from_value(hit).unwrap();
        assert_eq!(hit.id, 7);
        assert_eq!(hit.image_type, "vector/ai");
        assert_eq!(hit.views, 100);
    }
}
