//! Rate-limited HTTP client for the coin data provider.
//!
//! CoinGecko's public tier tolerates roughly 30 requests/minute, so the
//! client enforces a minimum inter-request interval and honours the
//! provider's `Retry-After` header on 429 responses.
//!
//! Auth: optional demo key via the `x-cg-demo-api-key` header.

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::types::HeraldError;

/// Fallback wait when a 429 carries no `Retry-After` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Wraps upstream calls with minimum-interval pacing and mandatory
/// wait-then-retry on "slow down" responses.
///
/// The last-call timestamp is guarded by an async mutex held across the
/// send, so concurrent callers sharing one instance are serialized and
/// cannot defeat the interval guarantee.
pub struct RateLimitedClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimitedClient {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        min_interval: Duration,
    ) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("coin-herald/0.1.0")
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build market HTTP client: {e}"))?;

        Ok(Self {
            http,
            base_url,
            api_key,
            min_interval,
            last_request: Mutex::new(None),
        })
    }

    /// Issue a GET request against `endpoint`, returning the parsed JSON
    /// body.
    ///
    /// Pacing: waits out the remainder of `min_interval` since the last
    /// completed call before sending. On a 429 the client sleeps for the
    /// server-suggested duration and retries, iterating until success or
    /// a non-rate-limit failure. The last-call timestamp is updated only
    /// after a response is received, never before sending.
    pub async fn request(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value, HeraldError> {
        let url = format!("{}{}", self.base_url, endpoint);

        // Serializes concurrent callers for the duration of the call.
        let mut last = self.throttle().await;

        loop {
            debug!(url = %url, "Market API request");

            let mut req = self.http.get(&url).query(params);
            if let Some(key) = &self.api_key {
                req = req.header("x-cg-demo-api-key", key);
            }

            let resp = req.send().await.map_err(|e| HeraldError::Upstream {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })?;

            *last = Some(Instant::now());

            if resp.status() == StatusCode::TOO_MANY_REQUESTS {
                let wait = retry_after_secs(resp.headers());
                warn!(endpoint, wait_secs = wait, "Rate limited by provider, backing off");
                tokio::time::sleep(Duration::from_secs(wait)).await;
                continue;
            }

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                return Err(HeraldError::Upstream {
                    endpoint: endpoint.to_string(),
                    message: format!("HTTP {status}: {body}"),
                });
            }

            return resp.json().await.map_err(|e| HeraldError::UpstreamData {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            });
        }
    }

    /// Wait until at least `min_interval` has elapsed since the last
    /// completed call, then hand back the (locked) timestamp slot.
    async fn throttle(&self) -> MutexGuard<'_, Option<Instant>> {
        let last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        last
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

/// Parse the provider's suggested wait from `Retry-After`, defaulting
/// to 60 seconds when the header is absent or unreadable.
fn retry_after_secs(headers: &reqwest::header::HeaderMap) -> u64 {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
