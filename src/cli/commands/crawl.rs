//! Crawl command: enumerate the parameter space and persist the metadata
//! table.

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::api::ApiClient;
use crate::config::Settings;
use crate::crawl::{CrawlPlan, Crawler};
use crate::storage;

/// Crawl the search API and write the metadata table.
pub async fn cmd_crawl(
    settings: &Settings,
    api_key: Option<String>,
    per_page: Option<u32>,
    num_images: Option<u32>,
) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    let mut settings = settings.clone();
    if api_key.is_some() {
        settings.api_key = api_key;
    }
    if let Some(per_page) = per_page {
        settings.per_page = per_page;
    }
    if let Some(num_images) = num_images {
        settings.num_images = num_images;
    }

    // The table is the expensive artifact; never clobber one that exists.
    let metadata_path = settings.metadata_path();
    if metadata_path.exists() {
        println!(
            "{} Metadata table already exists at {}",
            style("!").yellow(),
            metadata_path.display()
        );
        println!("  Delete it to re-crawl, or run 'pixcrawl curate' to process it.");
        return Ok(());
    }

    let api_key = settings.require_api_key()?;
    let client = ApiClient::new(
        &settings.base_url,
        api_key,
        settings.per_page,
        Duration::from_secs(settings.request_timeout),
        Duration::from_millis(settings.request_delay_ms),
        settings.max_retries,
    )?;

    let plan = CrawlPlan::with_targets(settings.per_page, settings.num_images);
    let total_pages = plan.combinations().len() as u64 * plan.pages().count() as u64;

    if total_pages == 0 {
        println!(
            "{} Nothing to crawl: num_images ({}) is below per_page ({})",
            style("!").yellow(),
            settings.num_images,
            settings.per_page
        );
        return Ok(());
    }

    println!(
        "{} Crawling {} page queries across the parameter space",
        style("→").cyan(),
        total_pages
    );

    let pb = ProgressBar::new(total_pages);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} pages {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let crawler = Crawler::new(&client, plan);
    let (rows, summary) = crawler
        .run_with_progress(|done, _total| pb.set_position(done))
        .await;
    pb.finish_and_clear();

    storage::write_metadata(&metadata_path, &rows)?;

    println!(
        "{} Collected {} metadata rows into {}",
        style("✓").green(),
        summary.rows,
        metadata_path.display()
    );
    if summary.pages_failed > 0 {
        println!(
            "  {} {} page queries failed and were skipped",
            style("!").yellow(),
            summary.pages_failed
        );
    }
    if summary.rows_rejected > 0 {
        println!(
            "  {} {} hits rejected for missing required fields",
            style("!").yellow(),
            summary.rows_rejected
        );
    }
    let pacing = client.pacer().stats().await;
    if pacing.rate_limit_hits > 0 {
        println!(
            "  {} Rate limited {} times over {} requests (delay now {:?})",
            style("!").yellow(),
            pacing.rate_limit_hits,
            pacing.total_requests,
            pacing.current_delay
        );
    }
    println!(
        "  {} Run 'pixcrawl fetch' to download the images",
        style("→").dim()
    );

    Ok(())
}
