//! HTTP GET with bounded retry.
//!
//! Feed origins are flaky in exactly the way a personal aggregator notices:
//! one slow 503 at refresh time. A single retry with a short backoff rides
//! those out without hammering anyone's server.

use reqwest::{Client, Response};
use std::time::Duration;
use tracing::warn;

/// Total attempts (1 initial + 1 retry).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Pause between attempts.
pub const DEFAULT_BACKOFF_MS: u64 = 500;

/// Knobs for [`fetch_with_retry`].
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts; 0 is treated as 1.
    pub max_attempts: u32,
    /// Sleep between consecutive attempts.
    pub backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
        }
    }
}

/// GET `url`, retrying failed attempts (transport errors and non-2xx alike)
/// up to `config.max_attempts` total tries. Returns the first successful
/// response or the last error.
pub async fn fetch_with_retry(
    client: &Client,
    url: &str,
    config: &RetryConfig,
) -> Result<Response, reqwest::Error> {
    let attempts = config.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match client
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
        {
            Ok(response) => return Ok(response),
            Err(err) if attempt < attempts => {
                warn!(
                    "fetch of {} failed (attempt {}/{}): {}",
                    url, attempt, attempts, err
                );
                tokio::time::sleep(config.backoff).await;
                attempt += 1;
            }
            Err(err) => {
                warn!("fetch of {} failed on final attempt: {}", url, err);
                return Err(err);
            }
        }
    }
}
