//! Data models for crawled image metadata.

mod record;

pub use record::{ContentType, MetadataRecord, RawHit, RawRecord};
