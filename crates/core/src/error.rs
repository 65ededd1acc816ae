//! Error taxonomy for source adapters.
//!
//! `UpstreamUnavailable` and `RateLimited` are transient and handled by the
//! retry layer; `NotFound` and `MalformedResponse` surface to the caller
//! unchanged.

use thiserror::Error;

/// Errors produced while fetching metadata or observations from a source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network failure or 5xx response, surfaced after retries are exhausted.
    #[error("upstream unavailable: {message}")]
    UpstreamUnavailable {
        /// Description of the final failure.
        message: String,
    },

    /// The source does not know this series id.
    #[error("series not found: {series_id}")]
    NotFound {
        /// The series id that was not found.
        series_id: String,
    },

    /// The upstream response violated its contract (missing keys, wrong shape).
    #[error("malformed response: {context}")]
    MalformedResponse {
        /// What was wrong, including raw payload context.
        context: String,
    },

    /// HTTP 429 from the upstream; retried with backoff.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds suggested by the upstream before retrying.
        retry_after_secs: u64,
    },
}

impl SourceError {
    /// Creates an upstream-unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            message: message.into(),
        }
    }

    /// Creates a not-found error for a series id.
    pub fn not_found(series_id: impl Into<String>) -> Self {
        Self::NotFound {
            series_id: series_id.into(),
        }
    }

    /// Creates a malformed-response error with payload context.
    pub fn malformed(context: impl Into<String>) -> Self {
        Self::MalformedResponse {
            context: context.into(),
        }
    }

    /// Creates a rate-limited error.
    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Self::RateLimited { retry_after_secs }
    }

    /// Returns true if the retry layer should re-attempt the operation.
    ///
    /// All wrapped operations are read-only GETs, so retrying is safe.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::UpstreamUnavailable { .. } | Self::RateLimited { .. }
        )
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::unavailable(format!("request timed out: {err}"))
        } else if err.is_connect() {
            Self::unavailable(format!("connection failed: {err}"))
        } else {
            Self::unavailable(err.to_string())
        }
    }
}

/// Result type alias for source operations.
pub type SourceResult<T> = std::result::Result<T, SourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_is_retryable() {
        let err = SourceError::unavailable("503 from upstream");
        assert!(err.is_retryable());
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_rate_limited_is_retryable() {
        let err = SourceError::rate_limited(30);
        assert!(err.is_retryable());
        assert!(err.to_string().contains("30"));
    }

    #[test]
    fn test_not_found_is_not_retryable() {
        let err = SourceError::not_found("GDPXYZ");
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("GDPXYZ"));
    }

    #[test]
    fn test_malformed_is_not_retryable() {
        let err = SourceError::malformed("missing 'observations' key in {\"foo\": 1}");
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("observations"));
    }
}
