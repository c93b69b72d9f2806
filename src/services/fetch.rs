//! Resumable image download service.
//!
//! Walks the metadata table and downloads one asset per row, skipping rows
//! whose target file already exists, so re-running after a partial
//! completion or crash performs zero redundant network calls. Separated
//! from UI concerns - emits events for progress tracking.
//!
//! Known gap: a process killed mid-write can leave a truncated file that
//! later runs treat as fetched. Deleting the file makes the next run
//! re-fetch it. Failed downloads within a live process do clean up their
//! partial file.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use crate::models::MetadataRecord;

/// Configuration for a fetch run.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Directory receiving one file per row.
    pub image_dir: PathBuf,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Number of download workers.
    pub workers: usize,
    /// Maximum number of assets to download this run.
    pub limit: Option<usize>,
}

/// Progress events emitted by fetch workers.
#[derive(Debug)]
pub enum FetchEvent {
    Started { worker_id: usize, id: u64 },
    Completed { worker_id: usize, id: u64, bytes: u64 },
    Failed { worker_id: usize, id: u64, error: String },
}

/// Totals for a fetch run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FetchResult {
    /// Assets downloaded this run.
    pub downloaded: usize,
    /// Rows skipped because the target file already existed.
    pub skipped: usize,
    /// Rows whose download failed (logged, never fatal).
    pub failed: usize,
}

/// One unit of download work: a row whose target file does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchJob {
    pub id: u64,
    pub url: String,
    pub target: PathBuf,
}

/// Target path for a row's asset, deterministic in the row id.
pub fn asset_path(image_dir: &Path, id: u64) -> PathBuf {
    image_dir.join(format!("{}.jpg", id))
}

/// Partition the table into pending jobs, skipping rows whose target file
/// already exists.
///
/// Row ids are unique, so no two jobs share a target path; the single
/// pre-pass plus the per-job claim below means no two workers ever write
/// the same file.
pub fn plan_jobs(records: &[MetadataRecord], image_dir: &Path) -> Vec<FetchJob> {
    records
        .iter()
        .filter(|r| !asset_path(image_dir, r.id).exists())
        .map(|r| FetchJob {
            id: r.id,
            url: r.url.clone(),
            target: asset_path(image_dir, r.id),
        })
        .collect()
}

/// Service for downloading image assets listed in the metadata table.
pub struct FetchService {
    config: FetchConfig,
}

impl FetchService {
    /// Create a new fetch service.
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }

    /// Download pending assets.
    ///
    /// Spawns worker tasks that claim non-overlapping jobs from a shared
    /// cursor. Per-row failures are logged and counted; the run itself
    /// only fails on configuration problems (unwritable image directory,
    /// unbuildable HTTP client).
    pub async fn fetch(
        &self,
        records: &[MetadataRecord],
        event_tx: mpsc::Sender<FetchEvent>,
    ) -> anyhow::Result<FetchResult> {
        tokio::fs::create_dir_all(&self.config.image_dir).await?;

        let mut jobs = plan_jobs(records, &self.config.image_dir);
        let skipped = records.len() - jobs.len();
        if let Some(max) = self.config.limit {
            jobs.truncate(max);
        }

        if jobs.is_empty() {
            return Ok(FetchResult {
                downloaded: 0,
                skipped,
                failed: 0,
            });
        }

        let client = Client::builder()
            .timeout(self.config.request_timeout)
            .build()?;

        let jobs = Arc::new(jobs);
        let cursor = Arc::new(AtomicUsize::new(0));
        let downloaded = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));

        let workers = self.config.workers.max(1).min(jobs.len());
        let mut handles = Vec::with_capacity(workers);

        for worker_id in 0..workers {
            let client = client.clone();
            let jobs = jobs.clone();
            let cursor = cursor.clone();
            let downloaded = downloaded.clone();
            let failed = failed.clone();
            let event_tx = event_tx.clone();

            let handle = tokio::spawn(async move {
                loop {
                    // Claim the next job; each index is handed out once,
                    // so target paths never race.
                    let index = cursor.fetch_add(1, Ordering::SeqCst);
                    let Some(job) = jobs.get(index) else {
                        break;
                    };

                    let _ = event_tx
                        .send(FetchEvent::Started {
                            worker_id,
                            id: job.id,
                        })
                        .await;

                    match download_one(&client, job).await {
                        Ok(bytes) => {
                            downloaded.fetch_add(1, Ordering::Relaxed);
                            let _ = event_tx
                                .send(FetchEvent::Completed {
                                    worker_id,
                                    id: job.id,
                                    bytes,
                                })
                                .await;
                        }
                        Err(e) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                            tracing::warn!(id = job.id, url = %job.url, "asset fetch failed: {}", e);

                            // Drop any partial file so a re-run retries
                            // this row.
                            if job.target.exists() {
                                let _ = tokio::fs::remove_file(&job.target).await;
                            }

                            let _ = event_tx
                                .send(FetchEvent::Failed {
                                    worker_id,
                                    id: job.id,
                                    error: e.to_string(),
                                })
                                .await;
                        }
                    }
                }
            });

            handles.push(handle);
        }

        for handle in handles {
            let _ = handle.await;
        }

        Ok(FetchResult {
            downloaded: downloaded.load(Ordering::Relaxed),
            skipped,
            failed: failed.load(Ordering::Relaxed),
        })
    }
}

/// Stream one asset to its target path.
async fn download_one(client: &Client, job: &FetchJob) -> anyhow::Result<u64> {
    let response = client.get(&job.url).send().await?;

    if !response.status().is_success() {
        anyhow::bail!("HTTP {}", response.status());
    }

    let mut file = tokio::fs::File::create(&job.target).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentType;

    fn record(id: u64) -> MetadataRecord {
        MetadataRecord {
            id,
            content_type: ContentType::Authentic,
            image_type: "photo".to_string(),
            category: "Unknown".to_string(),
            colors: "Unknown".to_string(),
            editor_choice: "Unknown".to_string(),
            order: "popular".to_string(),
            tags: String::new(),
            views: 0,
            downloads: 0,
            likes: 0,
            comments: 0,
            url: format!("https://img.example/{}.jpg", id),
        }
    }

    #[test]
    fn test_asset_path_is_deterministic_in_id() {
        let dir = Path::new("/images");
        assert_eq!(asset_path(dir, 42), PathBuf::from("/images/42.jpg"));
    }

    #[test]
    fn test_plan_jobs_skips_existing_targets() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![record(1), record(2), record(3)];

        std::fs::write(asset_path(dir.path(), 2), b"already here").unwrap();

        let jobs = plan_jobs(&records, dir.path());
        let ids: Vec<u64> = jobs.iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_plan_jobs_empty_when_all_fetched() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![record(1), record(2)];
        for r in &records {
            std::fs::write(asset_path(dir.path(), r.id), b"x").unwrap();
        }

        assert!(plan_jobs(&records, dir.path()).is_empty());
    }
}
