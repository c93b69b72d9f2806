//! Feature engineering: engagement ratios, categorical encodings, and
//! z-score standardization.
//!
//! A deterministic, total function over a validated table. The one-hot
//! column set depends on the image types observed in the input (columns
//! are emitted in sorted order, so a given input always produces the same
//! header), which makes derived-table schemas run-dependent.

use std::collections::BTreeSet;

use crate::models::{ContentType, MetadataRecord};

/// Numeric column labels, in the order `DerivedRecord::numeric` uses.
pub const NUMERIC_COLUMNS: [&str; 7] = [
    "Views",
    "Likes",
    "Downloads",
    "Comments",
    "Likes_Per_View",
    "Downloads_Per_View",
    "Comments_Per_View",
];

/// Prefix for one-hot image-type columns.
const IMAGE_TYPE_PREFIX: &str = "Image_Type_";

/// Replace path-separator-like characters so an image type is safe as a
/// column name or filename fragment.
pub fn sanitize_image_type(value: &str) -> String {
    value.replace(['/', '\\'], "_")
}

/// One fully engineered row.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRecord {
    pub id: u64,
    /// 1 for AI-generated content, 0 for authentic.
    pub content_type: u8,
    pub category: String,
    pub colors: String,
    pub editor_choice: String,
    pub order: String,
    pub tags: String,
    pub url: String,
    /// Standardized numerics, aligned with [`NUMERIC_COLUMNS`].
    pub numeric: Vec<f64>,
    /// One-hot flags aligned with `DerivedTable::image_type_columns`.
    pub image_type: Vec<u8>,
}

/// The engineered table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DerivedTable {
    /// Sanitized one-hot column suffixes, sorted.
    pub image_type_columns: Vec<String>,
    pub records: Vec<DerivedRecord>,
}

impl DerivedTable {
    /// Full CSV header for this table.
    pub fn headers(&self) -> Vec<String> {
        let mut headers = vec![
            "ID".to_string(),
            "Content_Type".to_string(),
            "Category".to_string(),
            "Colors".to_string(),
            "Editor_Choice".to_string(),
            "Order".to_string(),
            "Tags".to_string(),
            "URL".to_string(),
        ];
        headers.extend(NUMERIC_COLUMNS.iter().map(|c| c.to_string()));
        headers.extend(
            self.image_type_columns
                .iter()
                .map(|c| format!("{}{}", IMAGE_TYPE_PREFIX, c)),
        );
        headers
    }

    /// Rows as printable CSV fields, aligned with [`headers`](Self::headers).
    pub fn rows(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.records.iter().map(|r| {
            let mut fields = vec![
                r.id.to_string(),
                r.content_type.to_string(),
                r.category.clone(),
                r.colors.clone(),
                r.editor_choice.clone(),
                r.order.clone(),
                r.tags.clone(),
                r.url.clone(),
            ];
            fields.extend(r.numeric.iter().map(|v| v.to_string()));
            fields.extend(r.image_type.iter().map(|v| v.to_string()));
            fields
        })
    }
}

/// Engineer the validated table into a model-ready one.
///
/// Ratios use the `views == 0` rule: any row with zero views yields zero
/// for all three per-view ratios. Standardization re-fits on the table
/// being transformed, so outputs are only comparable across runs with
/// identical input tables.
pub fn engineer(records: &[MetadataRecord]) -> DerivedTable {
    // Fixed vocabulary for this run: the sanitized image types observed,
    // sorted.
    let image_type_columns: Vec<String> = records
        .iter()
        .map(|r| sanitize_image_type(&r.image_type))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    // Raw numeric matrix, one row per record.
    let mut numeric: Vec<Vec<f64>> = records
        .iter()
        .map(|r| {
            let views = r.views as f64;
            let ratio = |raw: u64| if r.views == 0 { 0.0 } else { raw as f64 / views };
            vec![
                views,
                r.likes as f64,
                r.downloads as f64,
                r.comments as f64,
                ratio(r.likes),
                ratio(r.downloads),
                ratio(r.comments),
            ]
        })
        .collect();

    standardize(&mut numeric);

    let records = records
        .iter()
        .zip(numeric)
        .map(|(r, numeric)| {
            let sanitized = sanitize_image_type(&r.image_type);
            let image_type = image_type_columns
                .iter()
                .map(|c| u8::from(*c == sanitized))
                .collect();

            DerivedRecord {
                id: r.id,
                content_type: u8::from(r.content_type == ContentType::Ai),
                category: r.category.clone(),
                colors: r.colors.clone(),
                editor_choice: r.editor_choice.clone(),
                order: r.order.clone(),
                tags: r.tags.clone(),
                url: r.url.clone(),
                numeric,
                image_type,
            }
        })
        .collect();

    DerivedTable {
        image_type_columns,
        records,
    }
}

/// Z-score each column in place: mean 0, unit variance, population
/// standard deviation. Zero-variance columns map to all zeros.
fn standardize(matrix: &mut [Vec<f64>]) {
    let rows = matrix.len();
    if rows == 0 {
        return;
    }
    let cols = matrix[0].len();

    for col in 0..cols {
        let mean = matrix.iter().map(|r| r[col]).sum::<f64>() / rows as f64;
        let var = matrix.iter().map(|r| (r[col] - mean).powi(2)).sum::<f64>() / rows as f64;
        let std = var.sqrt();

        for row in matrix.iter_mut() {
            row[col] = if std == 0.0 { 0.0 } else { (row[col] - mean) / std };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, image_type: &str, views: u64, likes: u64) -> MetadataRecord {
        MetadataRecord {
            id,
            content_type: ContentType::Authentic,
            image_type: image_type.to_string(),
            category: "Unknown".to_string(),
            colors: "Unknown".to_string(),
            editor_choice: "Unknown".to_string(),
            order: "popular".to_string(),
            tags: String::new(),
            views,
            downloads: 0,
            likes,
            comments: 0,
            url: String::new(),
        }
    }

    /// Ratios before standardization, for assertions on the raw rule.
    fn raw_ratio(views: u64, raw: u64) -> f64 {
        if views == 0 {
            0.0
        } else {
            raw as f64 / views as f64
        }
    }

    #[test]
    fn test_zero_views_yields_zero_ratio() {
        // views=0, likes=5 must give 0, not NaN or infinity
        assert_eq!(raw_ratio(0, 5), 0.0);
        assert_eq!(raw_ratio(0, 0), 0.0);

        let table = engineer(&[record(1, "photo", 0, 5)]);
        for v in &table.records[0].numeric {
            assert!(v.is_finite());
        }
    }

    #[test]
    fn test_one_hot_columns_sorted_and_sanitized() {
        let table = engineer(&[
            record(1, "vector/ai", 10, 1),
            record(2, "photo", 10, 1),
            record(3, "illustration", 10, 1),
            record(4, "photo", 10, 1),
        ]);

        assert_eq!(
            table.image_type_columns,
            vec!["illustration", "photo", "vector_ai"]
        );
        // record 1 is vector/ai -> third flag set
        assert_eq!(table.records[0].image_type, vec![0, 0, 1]);
        // record 2 is photo -> second flag set
        assert_eq!(table.records[1].image_type, vec![0, 1, 0]);

        let headers = table.headers();
        assert!(headers.contains(&"Image_Type_vector_ai".to_string()));
    }

    #[test]
    fn test_standardization_zero_mean_unit_variance() {
        let table = engineer(&[
            record(1, "photo", 100, 10),
            record(2, "photo", 200, 20),
            record(3, "photo", 300, 30),
        ]);

        // Views column: mean 0, unit variance
        let views: Vec<f64> = table.records.iter().map(|r| r.numeric[0]).collect();
        let mean: f64 = views.iter().sum::<f64>() / views.len() as f64;
        let var: f64 = views.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / views.len() as f64;
        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_variance_column_maps_to_zero() {
        let table = engineer(&[record(1, "photo", 100, 5), record(2, "photo", 200, 5)]);
        // Likes are constant, so the standardized column is all zeros.
        for r in &table.records {
            assert_eq!(r.numeric[1], 0.0);
        }
    }

    #[test]
    fn test_binary_content_type() {
        let mut ai = record(1, "photo", 10, 1);
        ai.content_type = ContentType::Ai;
        let table = engineer(&[ai, record(2, "photo", 10, 1)]);
        assert_eq!(table.records[0].content_type, 1);
        assert_eq!(table.records[1].content_type, 0);
    }

    #[test]
    fn test_engineer_empty_table() {
        let table = engineer(&[]);
        assert!(table.records.is_empty());
        assert!(table.image_type_columns.is_empty());
        assert_eq!(table.headers().len(), 8 + NUMERIC_COLUMNS.len());
    }
}
