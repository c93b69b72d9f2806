//! Long-running pipeline services, separated from CLI presentation.

mod fetch;

pub use fetch::{
    asset_path, plan_jobs, FetchConfig, FetchEvent, FetchJob, FetchResult, FetchService,
};
