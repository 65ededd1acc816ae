//! Application configuration tree.
//!
//! Sources are optional sections: an adapter is only registered when its
//! section is present.

use crate::http::HttpClientConfig;
use crate::retry::BackoffPolicy;
use crate::types::SeriesKind;
use nonzero_ext::nonzero;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub fred: Option<FredConfig>,
    #[serde(default)]
    pub polygon: Option<PolygonConfig>,
    #[serde(default)]
    pub csv: Option<CsvConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            ingest: IngestConfig::default(),
            fred: None,
            polygon: None,
            csv: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/econ_ingest".to_string(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    10
}

/// Knobs for the fetch-and-merge workflow shared by all sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Window length when a series has no watermark yet (5 years).
    pub default_lookback_days: i64,
    /// Total fetch attempts including the first.
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_secs: u64,
    pub request_timeout_secs: u64,
    /// Per-source request budget.
    pub requests_per_second: u32,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            default_lookback_days: 5 * 365,
            max_retries: 5,
            retry_base_delay_ms: 300,
            retry_max_delay_secs: 30,
            request_timeout_secs: 10,
            requests_per_second: 5,
        }
    }
}

impl IngestConfig {
    /// Backoff policy derived from the retry knobs.
    #[must_use]
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            self.max_retries,
            Duration::from_millis(self.retry_base_delay_ms),
            Duration::from_secs(self.retry_max_delay_secs),
        )
    }

    /// HTTP client configuration derived from the network knobs.
    #[must_use]
    pub fn http_client(&self) -> HttpClientConfig {
        HttpClientConfig::default()
            .with_timeout(Duration::from_secs(self.request_timeout_secs))
            .with_requests_per_second(
                std::num::NonZeroU32::new(self.requests_per_second).unwrap_or(nonzero!(1u32)),
            )
            .with_backoff(self.backoff())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FredConfig {
    pub api_key: String,
    #[serde(default = "default_fred_base_url")]
    pub base_url: String,
}

fn default_fred_base_url() -> String {
    "https://api.stlouisfed.org/fred".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolygonConfig {
    pub api_key: String,
    #[serde(default = "default_polygon_base_url")]
    pub base_url: String,
}

fn default_polygon_base_url() -> String {
    "https://api.polygon.io".to_string()
}

/// Local CSV source: logical-source-name to file, with an explicit per-file
/// date format. No auto-detection; ambiguous day/month orders made that
/// unsafe in practice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvConfig {
    pub kind: SeriesKind,
    #[serde(default)]
    pub files: BTreeMap<String, CsvFileConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvFileConfig {
    pub path: PathBuf,
    /// chrono strftime pattern, e.g. "%d/%m/%Y".
    pub date_format: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.ingest.default_lookback_days, 1825);
        assert_eq!(config.ingest.max_retries, 5);
        assert!(config.fred.is_none());
        assert!(config.csv.is_none());
    }

    #[test]
    fn test_backoff_from_ingest_config() {
        let ingest = IngestConfig::default();
        let backoff = ingest.backoff();
        assert_eq!(backoff.max_attempts, 5);
        assert_eq!(backoff.base_delay, Duration::from_millis(300));
        assert_eq!(backoff.max_delay, Duration::from_secs(30));
    }

    #[test]
    fn test_http_client_config_zero_rps_clamped() {
        let ingest = IngestConfig {
            requests_per_second: 0,
            ..IngestConfig::default()
        };
        assert_eq!(ingest.http_client().requests_per_second.get(), 1);
    }

    #[test]
    fn test_csv_config_toml() {
        let toml = r#"
            kind = "economic"

            [files.vix]
            path = "data/vix.csv"
            date_format = "%d/%m/%Y"
        "#;
        let config: CsvConfig = toml_from_str(toml);
        assert_eq!(config.kind, SeriesKind::Economic);
        assert_eq!(config.files["vix"].date_format, "%d/%m/%Y");
    }

    fn toml_from_str<T: serde::de::DeserializeOwned>(s: &str) -> T {
        use figment::providers::Format;
        figment::Figment::new()
            .merge(figment::providers::Toml::string(s))
            .extract()
            .expect("valid toml")
    }
}
