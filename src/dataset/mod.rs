//! Cleaning and feature engineering over the persisted metadata table.

mod clean;
mod features;
mod report;
mod stats;

pub use clean::{clean, CleaningReport};
pub use features::{engineer, sanitize_image_type, DerivedRecord, DerivedTable, NUMERIC_COLUMNS};
pub use report::ReportSink;
pub use stats::{median, summarize, ColumnSummary};
