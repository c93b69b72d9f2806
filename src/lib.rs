//! Pixcrawl - labeled image dataset acquisition and curation.
//!
//! Acquires image metadata from a paginated search API, downloads the
//! binary assets resumably, and curates the persisted table into a
//! validated, feature-engineered dataset.

pub mod api;
pub mod cli;
pub mod config;
pub mod crawl;
pub mod dataset;
pub mod models;
pub mod services;
pub mod storage;
