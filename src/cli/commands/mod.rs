//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific
//! modules.

mod crawl;
mod curate;
mod fetch;
mod init;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};

#[derive(Parser)]
#[command(name = "pixcrawl")]
#[command(about = "Image metadata acquisition and dataset curation pipeline")]
#[command(version)]
pub struct Cli {
    /// Data directory (overrides config file)
    #[arg(long, short = 'd', global = true)]
    data_dir: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Resolve relative paths from current working directory instead of config file location
    #[arg(long, global = true)]
    cwd: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data and image directories
    Init,

    /// Crawl the search API and build the metadata table
    Crawl {
        /// API key (can also be set via PIXCRAWL_API_KEY or config file)
        #[arg(long, env = "PIXCRAWL_API_KEY")]
        api_key: Option<String>,
        /// Results requested per page (overrides config)
        #[arg(long)]
        per_page: Option<u32>,
        /// Target image count per parameter combination (overrides config)
        #[arg(long)]
        num_images: Option<u32>,
    },

    /// Download image assets listed in the metadata table
    Fetch {
        /// Number of download workers (defaults to the configured worker count)
        #[arg(short, long)]
        workers: Option<usize>,
        /// Limit number of assets to download (0 = unlimited)
        #[arg(short, long, default_value = "0")]
        limit: usize,
    },

    /// Clean the metadata table and engineer the model-ready dataset
    Curate {
        /// Raw metadata table to curate (defaults to the data directory's metadata.csv)
        #[arg(long)]
        raw: Option<PathBuf>,
        /// Output path for the engineered dataset (defaults to the data directory's dataset.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        data_dir: cli.data_dir,
        use_cwd: cli.cwd,
    };
    let (settings, _config) = load_settings_with_options(options).await;

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Crawl {
            api_key,
            per_page,
            num_images,
        } => crawl::cmd_crawl(&settings, api_key, per_page, num_images).await,
        Commands::Fetch { workers, limit } => {
            fetch::cmd_fetch(&settings, workers, limit).await
        }
        Commands::Curate { raw, output } => {
            curate::cmd_curate(&settings, raw.as_deref(), output.as_deref()).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_workers_unset_falls_back_to_settings() {
        // No --workers flag: the configured worker count must win, so the
        // parser yields None instead of a hardcoded default.
        let cli = Cli::try_parse_from(["pixcrawl", "fetch"]).unwrap();
        match cli.command {
            Commands::Fetch { workers, limit } => {
                assert_eq!(workers, None);
                assert_eq!(limit, 0);
            }
            _ => panic!("expected fetch subcommand"),
        }
    }

    #[test]
    fn test_fetch_workers_flag_overrides() {
        let cli = Cli::try_parse_from(["pixcrawl", "fetch", "--workers", "8"]).unwrap();
        match cli.command {
            Commands::Fetch { workers, .. } => assert_eq!(workers, Some(8)),
            _ => panic!("expected fetch subcommand"),
        }
    }
}
