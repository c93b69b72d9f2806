//! Initialize command.

use console::style;

use crate::config::Settings;

/// Initialize the data and image directories.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    println!(
        "{} Initialized pixcrawl in {}",
        style("✓").green(),
        settings.data_dir.display()
    );
    println!("  Images: {}", settings.image_dir.display());
    println!("  Metadata table: {}", settings.metadata_path().display());

    if settings.api_key.is_none() {
        println!(
            "{} No API key configured. Set PIXCRAWL_API_KEY or add api_key to a config file.",
            style("!").yellow()
        );
    }

    println!(
        "  {} Run 'pixcrawl crawl' to build the metadata table",
        style("→").dim()
    );

    Ok(())
}
