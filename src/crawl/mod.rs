//! Metadata crawl: the parameter-space enumerator driving the API client,
//! with hits flattened into metadata rows.
//!
//! Queries run strictly sequentially in product order then ascending page
//! number, so the table order (and therefore the cleaning stage's
//! keep-first duplicate survivor) is deterministic. Per-page failures are
//! logged and skipped; the crawl always continues.

mod plan;

pub use plan::{Combination, CrawlPlan, UNKNOWN};

use tracing::{info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::{MetadataRecord, RawHit};

/// Outcome counters for a full metadata crawl.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Rows accumulated into the table.
    pub rows: usize,
    /// Pages that returned an error and were skipped.
    pub pages_failed: usize,
    /// Hits rejected for missing required fields.
    pub rows_rejected: usize,
}

/// Flatten one API hit into a metadata row.
///
/// Categorical dimensions come from the combination; engagement counters
/// come from the hit and are never defaulted.
pub fn flatten(hit: RawHit, combo: &Combination) -> MetadataRecord {
    MetadataRecord {
        id: hit.id,
        content_type: combo.content_type,
        image_type: hit.image_type,
        category: combo.category.clone(),
        colors: combo.colors.clone(),
        editor_choice: combo.editor_choice.clone(),
        order: combo.order.clone(),
        tags: hit.tags,
        views: hit.views,
        downloads: hit.downloads,
        likes: hit.likes,
        comments: hit.comments,
        url: hit.large_image_url,
    }
}

/// Drives the API client over the whole parameter space and accumulates
/// the raw metadata table. No deduplication happens here - that is the
/// cleaning stage's responsibility over the full persisted table.
pub struct Crawler<'a> {
    client: &'a ApiClient,
    plan: CrawlPlan,
}

impl<'a> Crawler<'a> {
    pub fn new(client: &'a ApiClient, plan: CrawlPlan) -> Self {
        Self { client, plan }
    }

    /// Fetch every page of every combination and accumulate the rows.
    pub async fn run(&self) -> (Vec<MetadataRecord>, CrawlSummary) {
        self.run_with_progress(|_, _| {}).await
    }

    /// Like [`run`](Self::run), invoking `on_page` after each page query
    /// with (pages done, total pages) so callers can render progress.
    pub async fn run_with_progress(
        &self,
        mut on_page: impl FnMut(u64, u64),
    ) -> (Vec<MetadataRecord>, CrawlSummary) {
        let combinations = self.plan.combinations();
        let pages_per_combo = self.plan.pages().count() as u64;
        let total_pages = combinations.len() as u64 * pages_per_combo;

        let mut rows = Vec::new();
        let mut summary = CrawlSummary::default();
        let mut pages_done = 0u64;

        for combo in &combinations {
            for page in self.plan.pages() {
                match self.client.query(combo, page).await {
                    Ok(result) => {
                        summary.rows_rejected += result.rejected;
                        rows.extend(result.hits.into_iter().map(|hit| flatten(hit, combo)));
                    }
                    Err(ApiError::Application { status, body }) => {
                        warn!(
                            %status,
                            content_type = combo.content_type.as_str(),
                            image_type = %combo.image_type,
                            page,
                            "query rejected, skipping page: {}",
                            body.trim()
                        );
                        summary.pages_failed += 1;
                    }
                    Err(e) => {
                        warn!(
                            content_type = combo.content_type.as_str(),
                            image_type = %combo.image_type,
                            page,
                            "query failed, skipping page: {}",
                            e
                        );
                        summary.pages_failed += 1;
                    }
                }

                pages_done += 1;
                on_page(pages_done, total_pages);
            }
        }

        summary.rows = rows.len();
        info!(
            rows = summary.rows,
            pages_failed = summary.pages_failed,
            rows_rejected = summary.rows_rejected,
            "metadata crawl finished"
        );

        (rows, summary)
    }
}
