//! Fetch command: download image assets listed in the metadata table.

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use crate::config::Settings;
use crate::services::{FetchConfig, FetchEvent, FetchService};
use crate::storage;

/// Download pending image assets.
pub async fn cmd_fetch(
    settings: &Settings,
    workers: Option<usize>,
    limit: usize,
) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    let workers = workers.unwrap_or(settings.workers);

    let metadata_path = settings.metadata_path();
    if !metadata_path.exists() {
        println!(
            "{} No metadata table at {}",
            style("!").yellow(),
            metadata_path.display()
        );
        println!("  Run 'pixcrawl crawl' first.");
        return Ok(());
    }

    let records = storage::read_metadata(&metadata_path)?;
    if records.is_empty() {
        println!("{} Metadata table is empty", style("!").yellow());
        return Ok(());
    }

    println!(
        "{} Starting {} fetch workers over {} metadata rows",
        style("→").cyan(),
        workers,
        records.len()
    );

    let service = FetchService::new(FetchConfig {
        image_dir: settings.image_dir.clone(),
        request_timeout: Duration::from_secs(settings.request_timeout),
        workers,
        limit: if limit > 0 { Some(limit) } else { None },
    });

    // Event channel for progress updates (UI layer)
    let (event_tx, mut event_rx) = mpsc::channel::<FetchEvent>(100);

    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let pb_clone = pb.clone();
    let event_handler = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                FetchEvent::Started { id, .. } => {
                    pb_clone.set_message(format!("{}.jpg", id));
                }
                FetchEvent::Completed { .. } => {
                    pb_clone.inc(1);
                }
                FetchEvent::Failed { id, error, .. } => {
                    pb_clone.inc(1);
                    pb_clone.set_message(format!("{}.jpg failed: {}", id, error));
                }
            }
        }
    });

    let result = service.fetch(&records, event_tx).await?;
    let _ = event_handler.await;
    pb.finish_and_clear();

    println!(
        "{} Downloaded {} assets into {}",
        style("✓").green(),
        result.downloaded,
        settings.image_dir.display()
    );
    if result.skipped > 0 {
        println!(
            "  {} {} already present, skipped",
            style("→").dim(),
            result.skipped
        );
    }
    if result.failed > 0 {
        println!(
            "  {} {} downloads failed (re-run to retry)",
            style("!").yellow(),
            result.failed
        );
    }

    Ok(())
}
