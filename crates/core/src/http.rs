//! Retrying HTTP client shared by the REST source adapters.
//!
//! Wraps reqwest with a request timeout, a governor rate limiter, and the
//! bounded backoff combinator. Only GETs go through here, so retries are
//! idempotent by construction.

use crate::error::{SourceError, SourceResult};
use crate::retry::{retry_with_backoff, BackoffPolicy};
use anyhow::Result;
use governor::{clock::DefaultClock, state::InMemoryState, Quota, RateLimiter};
use nonzero_ext::nonzero;
use serde_json::Value as JsonValue;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for [`RetryingHttpClient`].
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Upstream request budget.
    pub requests_per_second: NonZeroU32,
    /// Retry schedule for transient failures.
    pub backoff: BackoffPolicy,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            requests_per_second: nonzero!(5u32),
            backoff: BackoffPolicy::default(),
        }
    }
}

impl HttpClientConfig {
    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the rate limit.
    #[must_use]
    pub fn with_requests_per_second(mut self, rps: NonZeroU32) -> Self {
        self.requests_per_second = rps;
        self
    }

    /// Sets the backoff policy.
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }
}

/// HTTP GET client with rate limiting and bounded exponential backoff.
pub struct RetryingHttpClient {
    http: reqwest::Client,
    rate_limiter: Arc<RateLimiter<governor::state::direct::NotKeyed, InMemoryState, DefaultClock>>,
    policy: BackoffPolicy,
}

impl RetryingHttpClient {
    /// Creates a client from the given configuration.
    ///
    /// # Errors
    /// Returns an error if the underlying reqwest client cannot be built.
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        let quota = Quota::per_second(config.requests_per_second);

        Ok(Self {
            http,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
            policy: config.backoff,
        })
    }

    /// Performs a GET and decodes the body as JSON, retrying transient
    /// failures.
    ///
    /// Status mapping: 404 is `NotFound` for `series_id`, 429 is
    /// `RateLimited`, 5xx and transport errors are `UpstreamUnavailable`
    /// (both retried), any other non-success is `MalformedResponse`.
    ///
    /// # Errors
    /// See [`SourceError`]; transient errors surface only after the retry
    /// budget is exhausted.
    pub async fn get_json(
        &self,
        series_id: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> SourceResult<JsonValue> {
        retry_with_backoff(&self.policy, || async {
            self.rate_limiter.until_ready().await;
            tracing::debug!(url, series_id, "GET");

            let response = self.http.get(url).query(query).send().await?;
            let status = response.status();

            if status.as_u16() == 404 {
                return Err(SourceError::not_found(series_id));
            }
            if status.as_u16() == 429 {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1);
                return Err(SourceError::rate_limited(retry_after));
            }
            if status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                return Err(SourceError::unavailable(format!("{status}: {body}")));
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(SourceError::malformed(format!(
                    "unexpected status {status}: {body}"
                )));
            }

            response
                .json::<JsonValue>()
                .await
                .map_err(|err| SourceError::malformed(format!("invalid JSON body: {err}")))
        })
        .await
    }
}
