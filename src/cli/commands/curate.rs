//! Curate command: clean the metadata table and engineer the dataset.

use std::path::Path;

use console::style;

use crate::config::Settings;
use crate::dataset::{clean, engineer, summarize, ColumnSummary, ReportSink, NUMERIC_COLUMNS};
use crate::models::RawRecord;
use crate::storage;

/// Clean the metadata table and write the model-ready dataset.
pub async fn cmd_curate(
    settings: &Settings,
    raw_path: Option<&Path>,
    output_path: Option<&Path>,
) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    let metadata_path = settings.metadata_path();
    let raw_path = raw_path.unwrap_or(&metadata_path);
    let dataset_path = settings.dataset_path();
    let output_path = output_path.unwrap_or(&dataset_path);

    if !raw_path.exists() {
        println!(
            "{} No metadata table at {}",
            style("!").yellow(),
            raw_path.display()
        );
        println!("  Run 'pixcrawl crawl' first, or pass --raw.");
        return Ok(());
    }

    let raw = storage::read_raw(raw_path)?;
    println!(
        "{} Curating {} raw rows from {}",
        style("→").cyan(),
        raw.len(),
        raw_path.display()
    );

    let mut sink = ReportSink::open(&settings.statistics_path())?;
    sink.write_run_header()?;
    sink.write_summary("Raw table", &raw_summaries(&raw))?;

    let (validated, report) = clean(raw);
    sink.write_report(&report)?;

    let table = engineer(&validated);
    storage::write_derived(output_path, &table)?;

    sink.write_summary("Derived table (standardized)", &derived_summaries(&table))?;
    sink.flush()?;

    println!(
        "{} Validated {} rows (dropped {} missing id, {} duplicates; relabeled {})",
        style("✓").green(),
        validated.len(),
        report.missing_id,
        report.duplicates,
        report.mis_marked
    );
    println!(
        "{} Wrote dataset to {}",
        style("✓").green(),
        output_path.display()
    );
    println!(
        "  {} Report appended to {}",
        style("→").dim(),
        settings.statistics_path().display()
    );

    Ok(())
}

/// Describe the raw engagement counters, each over the values present.
fn raw_summaries(raw: &[RawRecord]) -> Vec<ColumnSummary> {
    let column = |name: &str, get: fn(&RawRecord) -> Option<f64>| {
        let values: Vec<f64> = raw.iter().filter_map(get).collect();
        summarize(name, &values)
    };

    vec![
        column("Views", |r| r.views),
        column("Downloads", |r| r.downloads),
        column("Likes", |r| r.likes),
        column("Comments", |r| r.comments),
    ]
}

/// Describe the standardized numeric columns of the derived table.
fn derived_summaries(table: &crate::dataset::DerivedTable) -> Vec<ColumnSummary> {
    NUMERIC_COLUMNS
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let values: Vec<f64> = table.records.iter().map(|r| r.numeric[i]).collect();
            summarize(name, &values)
        })
        .collect()
}
