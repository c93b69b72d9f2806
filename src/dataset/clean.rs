//! Cleaning stage: repairs the raw metadata table into a validated one.
//!
//! Steps run in a fixed order; later steps operate on the already-reduced
//! row set, so the median fill at the end only sees rows that survived the
//! id-based drops.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::crawl::UNKNOWN;
use crate::models::{ContentType, MetadataRecord, RawRecord};

use super::stats::median;

/// Case-insensitive AI-indicator phrases looked for in tags.
const AI_TAG_PATTERN: &str = r"(?i)ai generated|ai-generated|ai_generated|aigenerated";

/// Image-type subtype that marks AI-generated vector content.
const AI_IMAGE_TYPE: &str = "vector/ai";

/// Counts of rows removed or relabeled by one cleaning pass, in the order
/// the steps run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleaningReport {
    /// Rows dropped for a missing id.
    pub missing_id: usize,
    /// Rows dropped for a duplicate id (first occurrence kept).
    pub duplicates: usize,
    /// Rows relabeled from authentic to ai.
    pub mis_marked: usize,
}

fn ai_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(AI_TAG_PATTERN).expect("AI tag pattern is valid"))
}

/// Whether a row's text or image-type signals AI-generated content.
fn ai_indicated(tags: Option<&str>, image_type: Option<&str>) -> bool {
    let tag_match = tags.is_some_and(|t| ai_tag_regex().is_match(t));
    let type_match = image_type.is_some_and(|t| t.eq_ignore_ascii_case(AI_IMAGE_TYPE));
    tag_match || type_match
}

/// Clean the raw table into a validated one.
///
/// Every surviving row resolves to exactly one content type; a missing or
/// unparseable `content_type` is inferred from the same AI-indicator
/// signals the relabel step uses (such rows are not counted as
/// mis-marked).
pub fn clean(raw: Vec<RawRecord>) -> (Vec<MetadataRecord>, CleaningReport) {
    let mut report = CleaningReport::default();
    let mut rows = raw;

    // Step 1: drop rows with missing id.
    let before = rows.len();
    rows.retain(|r| r.id.is_some());
    report.missing_id = before - rows.len();

    // Step 2: drop duplicate ids, keeping the first occurrence in table
    // order.
    let before = rows.len();
    let mut seen = HashSet::new();
    rows.retain(|r| seen.insert(r.id.unwrap_or_default()));
    report.duplicates = before - rows.len();

    // Step 3: relabel mis-marked authentic rows. One-directional: ai
    // rows are never flipped back.
    for row in &mut rows {
        let parsed = row.content_type.as_deref().and_then(ContentType::parse);
        if parsed == Some(ContentType::Authentic)
            && ai_indicated(row.tags.as_deref(), row.image_type.as_deref())
        {
            debug!(id = row.id, "relabeling mis-marked authentic row as ai");
            row.content_type = Some(ContentType::Ai.as_str().to_string());
            report.mis_marked += 1;
        }
    }

    // Step 6 prep: per-field medians over the rows surviving steps 1-2,
    // each field independent of other missing fields in the same row.
    let median_of = |get: fn(&RawRecord) -> Option<f64>| -> f64 {
        let present: Vec<f64> = rows.iter().filter_map(get).collect();
        median(&present)
    };
    let median_views = median_of(|r| r.views);
    let median_downloads = median_of(|r| r.downloads);
    let median_likes = median_of(|r| r.likes);
    let median_comments = median_of(|r| r.comments);

    // Steps 4-6: fill missing values and materialize validated rows.
    let validated = rows
        .into_iter()
        .map(|row| {
            let content_type = row
                .content_type
                .as_deref()
                .and_then(ContentType::parse)
                .unwrap_or_else(|| {
                    if ai_indicated(row.tags.as_deref(), row.image_type.as_deref()) {
                        ContentType::Ai
                    } else {
                        ContentType::Authentic
                    }
                });

            MetadataRecord {
                id: row.id.unwrap_or_default(),
                content_type,
                image_type: row.image_type.unwrap_or_else(|| UNKNOWN.to_string()),
                category: row.category.unwrap_or_else(|| UNKNOWN.to_string()),
                colors: row.colors.unwrap_or_else(|| UNKNOWN.to_string()),
                editor_choice: row.editor_choice.unwrap_or_else(|| UNKNOWN.to_string()),
                order: row.order.unwrap_or_else(|| UNKNOWN.to_string()),
                tags: row.tags.unwrap_or_default(),
                views: fill_counter(row.views, median_views),
                downloads: fill_counter(row.downloads, median_downloads),
                likes: fill_counter(row.likes, median_likes),
                comments: fill_counter(row.comments, median_comments),
                url: row.url.unwrap_or_default(),
            }
        })
        .collect();

    (validated, report)
}

/// Fill a missing counter with the column median, rounded to the nearest
/// integer; negative values clamp to zero.
fn fill_counter(value: Option<f64>, fill: f64) -> u64 {
    value.unwrap_or(fill).max(0.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: Option<u64>) -> RawRecord {
        RawRecord {
            id,
            content_type: Some("authentic".to_string()),
            image_type: Some("photo".to_string()),
            category: Some("Unknown".to_string()),
            colors: Some("Unknown".to_string()),
            editor_choice: Some("Unknown".to_string()),
            order: Some("popular".to_string()),
            tags: Some("sky".to_string()),
            views: Some(100.0),
            downloads: Some(10.0),
            likes: Some(5.0),
            comments: Some(1.0),
            url: Some("https://img.example/x.jpg".to_string()),
        }
    }

    #[test]
    fn test_missing_id_dropped_and_counted() {
        let (validated, report) = clean(vec![row(None), row(Some(1))]);
        assert_eq!(validated.len(), 1);
        assert_eq!(report.missing_id, 1);
    }

    #[test]
    fn test_duplicate_id_keeps_first_occurrence() {
        let mut first = row(Some(7));
        first.tags = Some("first".to_string());
        let mut second = row(Some(7));
        second.tags = Some("second".to_string());

        let (validated, report) = clean(vec![first, second]);
        assert_eq!(validated.len(), 1);
        assert_eq!(validated[0].tags, "first");
        assert_eq!(report.duplicates, 1);
    }

    #[test]
    fn test_relabel_is_one_directional() {
        let mut mis_marked = row(Some(1));
        mis_marked.tags = Some("this is ai-generated art".to_string());

        let mut genuine_ai = row(Some(2));
        genuine_ai.content_type = Some("ai".to_string());
        genuine_ai.tags = Some("portrait".to_string());

        let (validated, report) = clean(vec![mis_marked, genuine_ai]);
        assert_eq!(validated[0].content_type, ContentType::Ai);
        // ai rows with no AI-indicating tags stay ai, never flipped back
        assert_eq!(validated[1].content_type, ContentType::Ai);
        assert_eq!(report.mis_marked, 1);
    }

    #[test]
    fn test_relabel_on_ai_vector_subtype() {
        let mut vector_ai = row(Some(1));
        vector_ai.image_type = Some("vector/ai".to_string());

        let (validated, report) = clean(vec![vector_ai]);
        assert_eq!(validated[0].content_type, ContentType::Ai);
        assert_eq!(report.mis_marked, 1);
    }

    #[test]
    fn test_relabel_pattern_variants() {
        for tags in ["AI GENERATED", "ai_generated art", "aigenerated"] {
            let mut r = row(Some(1));
            r.tags = Some(tags.to_string());
            let (validated, report) = clean(vec![r]);
            assert_eq!(validated[0].content_type, ContentType::Ai, "tags: {tags}");
            assert_eq!(report.mis_marked, 1);
        }
    }

    #[test]
    fn test_median_fill_excludes_dropped_rows() {
        // The missing-id row carries an extreme value that must not skew
        // the median because it is dropped before the fill is computed.
        let mut dropped = row(None);
        dropped.views = Some(1_000_000.0);

        let mut a = row(Some(1));
        a.views = Some(10.0);
        let mut b = row(Some(2));
        b.views = Some(20.0);
        let mut missing = row(Some(3));
        missing.views = None;
        let mut c = row(Some(4));
        c.views = Some(40.0);

        let (validated, _) = clean(vec![dropped, a, b, missing, c]);
        let filled = validated.iter().find(|r| r.id == 3).unwrap();
        assert_eq!(filled.views, 20);
    }

    #[test]
    fn test_categorical_and_tag_fills() {
        let r = RawRecord {
            id: Some(9),
            ..Default::default()
        };

        let (validated, _) = clean(vec![r]);
        let row = &validated[0];
        assert_eq!(row.image_type, "Unknown");
        assert_eq!(row.category, "Unknown");
        assert_eq!(row.colors, "Unknown");
        assert_eq!(row.editor_choice, "Unknown");
        assert_eq!(row.order, "Unknown");
        assert_eq!(row.tags, "");
        // No AI indicators: the missing content type resolves to authentic.
        assert_eq!(row.content_type, ContentType::Authentic);
    }

    #[test]
    fn test_missing_content_type_with_ai_tags_resolves_to_ai() {
        let r = RawRecord {
            id: Some(9),
            tags: Some("ai generated landscape".to_string()),
            ..Default::default()
        };

        let (validated, report) = clean(vec![r]);
        assert_eq!(validated[0].content_type, ContentType::Ai);
        // Inferred fills are not mis-marked corrections.
        assert_eq!(report.mis_marked, 0);
    }
}
