//! Crawl parameter space enumeration.
//!
//! The enumeration is an explicit value over tuples of dimension values,
//! decoupled from the fetch loop, so the traversal order stays
//! deterministic: product order, then ascending page number.

use crate::models::ContentType;

/// Placeholder value for dimensions that are not enabled for a crawl.
pub const UNKNOWN: &str = "Unknown";

/// One tuple of crawl dimension values driving a paginated query sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combination {
    pub content_type: ContentType,
    pub image_type: String,
    pub category: String,
    pub colors: String,
    pub editor_choice: String,
    pub order: String,
}

/// Value sets for each crawl dimension plus pagination targets.
///
/// Disabled dimensions collapse to a single `"Unknown"` placeholder so the
/// Cartesian product stays well-formed and the placeholder flows into the
/// persisted rows.
#[derive(Debug, Clone)]
pub struct CrawlPlan {
    pub content_types: Vec<ContentType>,
    pub image_types: Vec<String>,
    pub categories: Vec<String>,
    pub colors: Vec<String>,
    pub editor_choices: Vec<String>,
    pub orders: Vec<String>,
    /// Results requested per page.
    pub per_page: u32,
    /// Target image count per combination.
    pub num_images: u32,
}

impl Default for CrawlPlan {
    fn default() -> Self {
        Self {
            content_types: vec![ContentType::Authentic, ContentType::Ai],
            image_types: vec!["photo".to_string(), "illustration".to_string()],
            categories: vec![UNKNOWN.to_string()],
            colors: vec![UNKNOWN.to_string()],
            editor_choices: vec![UNKNOWN.to_string()],
            orders: vec!["popular".to_string()],
            per_page: 200,
            num_images: 600,
        }
    }
}

impl CrawlPlan {
    /// Create the default plan with explicit pagination targets.
    pub fn with_targets(per_page: u32, num_images: u32) -> Self {
        Self {
            per_page,
            num_images,
            ..Default::default()
        }
    }

    /// All dimension combinations, in deterministic product order.
    pub fn combinations(&self) -> Vec<Combination> {
        let mut combos = Vec::new();
        for &content_type in &self.content_types {
            for image_type in &self.image_types {
                for category in &self.categories {
                    for colors in &self.colors {
                        for editor_choice in &self.editor_choices {
                            for order in &self.orders {
                                combos.push(Combination {
                                    content_type,
                                    image_type: image_type.clone(),
                                    category: category.clone(),
                                    colors: colors.clone(),
                                    editor_choice: editor_choice.clone(),
                                    order: order.clone(),
                                });
                            }
                        }
                    }
                }
            }
        }
        combos
    }

    /// Page numbers queried per combination: `1..=num_images / per_page`.
    ///
    /// Integer floor: a target smaller than one full page yields zero
    /// queries for the combination.
    pub fn pages(&self) -> std::ops::RangeInclusive<u32> {
        1..=(self.num_images / self.per_page.max(1))
    }
}
