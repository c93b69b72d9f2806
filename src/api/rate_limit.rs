//! Adaptive pacing for the remote search API.
//!
//! Tracks request timing against the single API endpoint and adapts the
//! delay based on responses: backs off on 429/503, gradually recovers
//! after consecutive successes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Pacing configuration.
#[derive(Debug, Clone)]
pub struct PacerConfig {
    /// Delay applied between requests when not backing off.
    pub base_delay: Duration,
    /// Floor for the recovered delay.
    pub min_delay: Duration,
    /// Ceiling for the backed-off delay.
    pub max_delay: Duration,
    /// Multiplier applied on a rate-limit response.
    pub backoff_multiplier: f64,
    /// Multiplier applied when recovering (must be < 1.0).
    pub recovery_multiplier: f64,
    /// Consecutive successes required before the delay shrinks.
    pub recovery_threshold: u32,
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            min_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            recovery_multiplier: 0.5,
            recovery_threshold: 3,
        }
    }
}

#[derive(Debug)]
struct PacerState {
    current_delay: Duration,
    last_request: Option<Instant>,
    in_backoff: bool,
    consecutive_successes: u32,
    total_requests: u64,
    rate_limit_hits: u64,
}

/// Snapshot of pacer counters, for status output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacerStats {
    pub current_delay: Duration,
    pub in_backoff: bool,
    pub total_requests: u64,
    pub rate_limit_hits: u64,
}

/// Adaptive request pacer shared by every query against the endpoint.
#[derive(Debug, Clone)]
pub struct RequestPacer {
    config: PacerConfig,
    state: Arc<Mutex<PacerState>>,
}

impl RequestPacer {
    /// Create a pacer with the default config and a custom base delay.
    pub fn new(base_delay: Duration) -> Self {
        Self::with_config(PacerConfig {
            base_delay,
            ..Default::default()
        })
    }

    /// Create a pacer with a custom config.
    pub fn with_config(config: PacerConfig) -> Self {
        let state = PacerState {
            current_delay: config.base_delay,
            last_request: None,
            in_backoff: false,
            consecutive_successes: 0,
            total_requests: 0,
            rate_limit_hits: 0,
        };
        Self {
            config,
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Wait until the endpoint is ready, then mark a request as started.
    pub async fn acquire(&self) {
        let wait_time = {
            let state = self.state.lock().await;
            match state.last_request {
                Some(last) => state.current_delay.saturating_sub(last.elapsed()),
                None => Duration::ZERO,
            }
        };

        if wait_time > Duration::ZERO {
            debug!("Rate limiting: waiting {:?}", wait_time);
            tokio::time::sleep(wait_time).await;
        }

        let mut state = self.state.lock().await;
        state.last_request = Some(Instant::now());
        state.total_requests += 1;
    }

    /// Report a successful request - may decrease the delay.
    pub async fn report_success(&self) {
        let mut state = self.state.lock().await;
        state.consecutive_successes += 1;

        // Recover from backoff after threshold successes
        if state.in_backoff && state.consecutive_successes >= self.config.recovery_threshold {
            let new_delay = Duration::from_secs_f64(
                state.current_delay.as_secs_f64() * self.config.recovery_multiplier,
            );
            state.current_delay = new_delay.max(self.config.min_delay);

            if state.current_delay <= self.config.base_delay {
                state.in_backoff = false;
                state.current_delay = self.config.base_delay;
                info!("Recovered from rate limit backoff");
            } else {
                debug!("Delay reduced to {:?}", state.current_delay);
            }

            state.consecutive_successes = 0;
        }
    }

    /// Report a definite rate limit hit (429 or 503) - increases the delay.
    pub async fn report_rate_limit(&self, status_code: u16) {
        let mut state = self.state.lock().await;
        state.rate_limit_hits += 1;
        state.consecutive_successes = 0;
        state.in_backoff = true;

        let new_delay = Duration::from_secs_f64(
            state.current_delay.as_secs_f64() * self.config.backoff_multiplier,
        );
        state.current_delay = new_delay.min(self.config.max_delay);

        warn!(
            "Rate limited (HTTP {}), backing off to {:?}",
            status_code, state.current_delay
        );
    }

    /// Report a server error (5xx other than 503) - mild backoff.
    pub async fn report_server_error(&self) {
        let mut state = self.state.lock().await;
        state.consecutive_successes = 0;
        let new_delay = Duration::from_secs_f64(state.current_delay.as_secs_f64() * 1.5);
        state.current_delay = new_delay.min(self.config.max_delay);
        debug!("Server error, delay increased to {:?}", state.current_delay);
    }

    /// Get a snapshot of the pacer counters.
    pub async fn stats(&self) -> PacerStats {
        let state = self.state.lock().await;
        PacerStats {
            current_delay: state.current_delay,
            in_backoff: state.in_backoff,
            total_requests: state.total_requests,
            rate_limit_hits: state.rate_limit_hits,
        }
    }
}

impl Default for RequestPacer {
    fn default() -> Self {
        Self::with_config(PacerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_backoff_on_rate_limit() {
        let pacer = RequestPacer::with_config(PacerConfig {
            base_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            ..Default::default()
        });

        pacer.acquire().await;
        pacer.report_rate_limit(429).await;

        let stats = pacer.stats().await;
        assert!(stats.current_delay >= Duration::from_millis(200));
        assert!(stats.in_backoff);
        assert_eq!(stats.rate_limit_hits, 1);
    }

    #[tokio::test]
    async fn test_recovery_after_consecutive_successes() {
        let pacer = RequestPacer::with_config(PacerConfig {
            base_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            recovery_multiplier: 0.25,
            recovery_threshold: 2,
            ..Default::default()
        });

        pacer.report_rate_limit(503).await;
        pacer.report_success().await;
        pacer.report_success().await;

        let stats = pacer.stats().await;
        assert!(!stats.in_backoff);
        assert_eq!(stats.current_delay, Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_delay_capped_at_max() {
        let pacer = RequestPacer::with_config(PacerConfig {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
            backoff_multiplier: 10.0,
            ..Default::default()
        });

        pacer.report_rate_limit(429).await;
        pacer.report_rate_limit(429).await;

        let stats = pacer.stats().await;
        assert_eq!(stats.current_delay, Duration::from_millis(300));
    }
}
