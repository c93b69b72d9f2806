//! Rate-limited client for the image search API.
//!
//! One endpoint, two request shapes: authentic content uses the plain
//! query, anything else augments it with a fixed `q=ai_generated` keyword.
//! Non-success responses surface their body as a diagnostic and are never
//! retried; transient transport failures are retried with bounded backoff.

mod rate_limit;

pub use rate_limit::{PacerConfig, PacerStats, RequestPacer};

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::crawl::Combination;
use crate::models::{ContentType, RawHit};

/// Fixed keyword query attached to the AI-content request shape.
const AI_KEYWORD_QUERY: &str = "ai_generated";

/// Base delay for the retry backoff schedule.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

/// Failure classification for API queries.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Timeout or connection failure. Retried with bounded backoff before
    /// being surfaced; the caller logs it and skips the page.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    /// Well-formed non-success response. Never retried - the body is the
    /// diagnostic and the page simply has no results.
    #[error("api returned HTTP {status}: {body}")]
    Application { status: StatusCode, body: String },
    /// The response body was not the expected JSON shape.
    #[error("malformed response body: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Hits from one result page, plus the number of records rejected for
/// missing required fields.
#[derive(Debug, Default)]
pub struct QueryPage {
    pub hits: Vec<RawHit>,
    pub rejected: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<serde_json::Value>,
}

/// Rate-limited client for the search endpoint.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    api_key: String,
    per_page: u32,
    max_retries: u32,
    pacer: RequestPacer,
}

impl ApiClient {
    /// Create a new API client.
    pub fn new(
        base_url: &str,
        api_key: &str,
        per_page: u32,
        timeout: Duration,
        request_delay: Duration,
        max_retries: u32,
    ) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| anyhow::anyhow!("invalid API base URL '{}': {}", base_url, e))?;
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()
            .expect("Failed to create HTTP client");

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
            per_page,
            max_retries,
            pacer: RequestPacer::new(request_delay),
        })
    }

    /// Get the request pacer for this client.
    pub fn pacer(&self) -> &RequestPacer {
        &self.pacer
    }

    /// Query one result page for a parameter combination.
    ///
    /// Hits missing a required field are rejected individually (logged with
    /// their page context) rather than failing the page.
    pub async fn query(&self, combo: &Combination, page: u32) -> Result<QueryPage, ApiError> {
        let mut attempt = 0u32;

        let response = loop {
            self.pacer.acquire().await;

            match self.send(combo, page).await {
                Ok(response) => break response,
                Err(e) if attempt < self.max_retries && is_transient(&e) => {
                    attempt += 1;
                    let backoff = RETRY_BASE_DELAY * 2u32.saturating_pow(attempt);
                    warn!(
                        content_type = combo.content_type.as_str(),
                        image_type = %combo.image_type,
                        page,
                        attempt,
                        "transient query failure, retrying in {:?}: {}",
                        backoff,
                        e
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(ApiError::Transport(e)),
            }
        };

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE {
            self.pacer.report_rate_limit(status.as_u16()).await;
        } else if status.is_server_error() {
            self.pacer.report_server_error().await;
        } else if status.is_success() {
            self.pacer.report_success().await;
        }

        if !status.is_success() {
            // Application-level rejection: surface the body, do not retry.
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Application { status, body });
        }

        let body = response.text().await?;
        let decoded: SearchResponse =
            serde_json::from_str(&body).map_err(ApiError::Decode)?;

        let mut result = QueryPage {
            hits: Vec::with_capacity(decoded.hits.len()),
            rejected: 0,
        };

        for hit in decoded.hits {
            match serde_json::from_value::<RawHit>(hit) {
                Ok(hit) => result.hits.push(hit),
                Err(e) => {
                    // Schema violation: fatal for this row only, never
                    // defaulted.
                    warn!(
                        content_type = combo.content_type.as_str(),
                        image_type = %combo.image_type,
                        page,
                        "rejecting hit with missing or invalid field: {}",
                        e
                    );
                    result.rejected += 1;
                }
            }
        }

        debug!(
            content_type = combo.content_type.as_str(),
            image_type = %combo.image_type,
            page,
            hits = result.hits.len(),
            "page fetched"
        );

        Ok(result)
    }

    async fn send(
        &self,
        combo: &Combination,
        page: u32,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let mut request = self.client.get(self.base_url.clone());

        // The AI shape carries a fixed keyword query; the authentic shape
        // stays plain. The two shapes are intentionally not parameterized
        // identically.
        if combo.content_type != ContentType::Authentic {
            request = request.query(&[("q", AI_KEYWORD_QUERY)]);
        }

        request
            .query(&[("key", self.api_key.as_str())])
            .query(&[("per_page", self.per_page), ("page", page)])
            .query(&[
                ("content_type", combo.content_type.as_str()),
                ("image_type", combo.image_type.as_str()),
            ])
            .send()
            .await
    }
}

/// Whether a transport error is worth retrying.
fn is_transient(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect()
}
