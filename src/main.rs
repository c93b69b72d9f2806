//! Pixcrawl - labeled image dataset acquisition and curation.
//!
//! A tool for building a labeled image-metadata dataset from a paginated
//! image-search API and preparing it for downstream modeling.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pixcrawl::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    // Initialize logging based on verbosity
    let default_filter = if cli::is_verbose() {
        "pixcrawl=info"
    } else {
        "pixcrawl=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Run CLI
    cli::run().await
}
