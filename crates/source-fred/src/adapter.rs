//! FRED (Federal Reserve Economic Data) source adapter.
//!
//! Metadata comes from the `series` endpoint, observations from
//! `series/observations`. FRED reports missing observations as the literal
//! value `"."`; those are dropped with a warning rather than failing the
//! fetch.

use async_trait::async_trait;
use chrono::NaiveDate;
use econ_ingest_core::{
    FetchWindow, FredConfig, Observation, RetryingHttpClient, SeriesKind, SeriesMetadata,
    SourceAdapter, SourceError, SourceResult,
};
use serde_json::Value as JsonValue;
use tracing::warn;

/// Registry key for this adapter.
pub const FRED_ORIGIN: &str = "fred";

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct FredAdapter {
    config: FredConfig,
    http: RetryingHttpClient,
}

impl FredAdapter {
    #[must_use]
    pub fn new(config: FredConfig, http: RetryingHttpClient) -> Self {
        Self { config, http }
    }

    fn parse_metadata(series_id: &str, body: &JsonValue) -> SourceResult<SeriesMetadata> {
        let series_list = body
            .get("seriess")
            .and_then(JsonValue::as_array)
            .ok_or_else(|| {
                SourceError::malformed(format!("missing 'seriess' array in response: {body}"))
            })?;
        let series = series_list
            .first()
            .ok_or_else(|| SourceError::not_found(series_id))?;

        let id = require_str(series, "id")?;
        let title = require_str(series, "title")?;

        let mut metadata = SeriesMetadata::new(id, title);
        metadata.observation_start = parse_date_field(series, "observation_start")?;
        metadata.observation_end = parse_date_field(series, "observation_end")?;
        metadata.frequency = optional_str(series, "frequency");
        metadata.units = optional_str(series, "units");
        metadata.seasonal_adjustment = optional_str(series, "seasonal_adjustment");
        metadata.notes = series
            .get("notes")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string();
        // FRED's last_updated carries a non-standard offset ("-06"); keep the
        // raw string in the side channel instead of guessing at it.
        if let Some(obj) = series.as_object() {
            metadata.extra = obj.clone();
        }

        Ok(metadata)
    }

    fn parse_observations(series_id: &str, body: &JsonValue) -> SourceResult<Vec<Observation>> {
        let items = body
            .get("observations")
            .and_then(JsonValue::as_array)
            .ok_or_else(|| {
                SourceError::malformed(format!("missing 'observations' array in response: {body}"))
            })?;

        let mut rows = Vec::with_capacity(items.len());
        for item in items {
            let date_str = item.get("date").and_then(JsonValue::as_str).ok_or_else(|| {
                SourceError::malformed(format!("observation missing 'date': {item}"))
            })?;
            let date = NaiveDate::parse_from_str(date_str, DATE_FORMAT).map_err(|err| {
                SourceError::malformed(format!("unparseable observation date '{date_str}': {err}"))
            })?;
            let raw_value = item.get("value").and_then(JsonValue::as_str).ok_or_else(|| {
                SourceError::malformed(format!("observation missing 'value': {item}"))
            })?;

            // "." is FRED's placeholder for a missing observation.
            match raw_value.parse::<f64>() {
                Ok(value) => rows.push(Observation::Economic {
                    series_id: series_id.to_string(),
                    date,
                    value,
                }),
                Err(_) => {
                    warn!(series_id, %date, raw_value, "dropping non-numeric observation value");
                }
            }
        }

        // Upstream contract is ordered and unique per date; enforce it so
        // downstream staging never sees a violation.
        rows.sort_by_key(Observation::date);
        rows.dedup_by_key(|obs| obs.date());
        Ok(rows)
    }
}

fn require_str(value: &JsonValue, key: &str) -> SourceResult<String> {
    value
        .get(key)
        .and_then(JsonValue::as_str)
        .map(str::to_string)
        .ok_or_else(|| SourceError::malformed(format!("series missing '{key}': {value}")))
}

fn optional_str(value: &JsonValue, key: &str) -> String {
    value
        .get(key)
        .and_then(JsonValue::as_str)
        .unwrap_or("N/A")
        .to_string()
}

fn parse_date_field(value: &JsonValue, key: &str) -> SourceResult<Option<NaiveDate>> {
    match value.get(key).and_then(JsonValue::as_str) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, DATE_FORMAT)
            .map(Some)
            .map_err(|err| SourceError::malformed(format!("unparseable '{key}' '{raw}': {err}"))),
    }
}

#[async_trait]
impl SourceAdapter for FredAdapter {
    fn origin(&self) -> &str {
        FRED_ORIGIN
    }

    fn kind(&self) -> SeriesKind {
        SeriesKind::Economic
    }

    async fn fetch_metadata(&self, series_id: &str) -> SourceResult<SeriesMetadata> {
        let url = format!("{}/series", self.config.base_url);
        let query = [
            ("series_id", series_id.to_string()),
            ("api_key", self.config.api_key.clone()),
            ("file_type", "json".to_string()),
        ];
        let body = self.http.get_json(series_id, &url, &query).await?;
        Self::parse_metadata(series_id, &body)
    }

    async fn fetch_observations(
        &self,
        series_id: &str,
        window: FetchWindow,
    ) -> SourceResult<Vec<Observation>> {
        let url = format!("{}/series/observations", self.config.base_url);
        let query = [
            ("series_id", series_id.to_string()),
            ("api_key", self.config.api_key.clone()),
            ("file_type", "json".to_string()),
            ("observation_start", window.start.format(DATE_FORMAT).to_string()),
            ("observation_end", window.end.format(DATE_FORMAT).to_string()),
        ];
        let body = self.http.get_json(series_id, &url, &query).await?;
        Self::parse_observations(series_id, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use econ_ingest_core::{BackoffPolicy, HttpClientConfig};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter_for(server: &MockServer) -> FredAdapter {
        let http = RetryingHttpClient::new(
            HttpClientConfig::default()
                .with_backoff(BackoffPolicy::new(2, Duration::from_millis(1), Duration::from_millis(5))),
        )
        .expect("client");
        FredAdapter::new(
            FredConfig {
                api_key: "test-key".to_string(),
                base_url: server.uri(),
            },
            http,
        )
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/series"))
            .and(query_param("series_id", "GDPC1"))
            .and(query_param("api_key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "seriess": [{
                    "id": "GDPC1",
                    "title": "Real Gross Domestic Product",
                    "observation_start": "1947-01-01",
                    "observation_end": "2024-01-01",
                    "frequency": "Quarterly",
                    "units": "Billions of Chained 2017 Dollars",
                    "seasonal_adjustment": "Seasonally Adjusted Annual Rate",
                    "last_updated": "2024-03-28 07:51:01-05",
                    "notes": "BEA Account Code: A191RX"
                }]
            })))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server);
        let metadata = adapter.fetch_metadata("GDPC1").await.expect("metadata");

        assert_eq!(metadata.series_id, "GDPC1");
        assert_eq!(metadata.title, "Real Gross Domestic Product");
        assert_eq!(metadata.observation_start, Some(date(1947, 1, 1)));
        assert_eq!(metadata.frequency, "Quarterly");
        assert_eq!(metadata.extra["last_updated"], "2024-03-28 07:51:01-05");
    }

    #[tokio::test]
    async fn test_metadata_unknown_series_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/series"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"seriess": []})))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server);
        let result = adapter.fetch_metadata("NOPE").await;
        assert!(matches!(result, Err(SourceError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_metadata_missing_seriess_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/series"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"error_message": "api_key invalid"})),
            )
            .mount(&server)
            .await;

        let adapter = adapter_for(&server);
        let result = adapter.fetch_metadata("GDPC1").await;
        assert!(matches!(result, Err(SourceError::MalformedResponse { .. })));
    }

    #[tokio::test]
    async fn test_fetch_observations_drops_placeholder_values() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/series/observations"))
            .and(query_param("observation_start", "2024-01-01"))
            .and(query_param("observation_end", "2024-01-05"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "observations": [
                    {"date": "2024-01-01", "value": "2.5"},
                    {"date": "2024-01-02", "value": "."},
                    {"date": "2024-01-03", "value": "2.7"}
                ]
            })))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server);
        let window = FetchWindow::new(date(2024, 1, 1), date(2024, 1, 5));
        let rows = adapter
            .fetch_observations("UNRATE", window)
            .await
            .expect("observations");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date(), date(2024, 1, 1));
        assert_eq!(rows[1].date(), date(2024, 1, 3));
    }

    #[tokio::test]
    async fn test_observations_missing_value_key_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/series/observations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "observations": [{"date": "2024-01-01"}]
            })))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server);
        let window = FetchWindow::new(date(2024, 1, 1), date(2024, 1, 5));
        let result = adapter.fetch_observations("UNRATE", window).await;
        assert!(matches!(result, Err(SourceError::MalformedResponse { .. })));
    }

    #[test]
    fn test_parse_observations_sorts_and_dedups() {
        let body = json!({
            "observations": [
                {"date": "2024-01-03", "value": "3.0"},
                {"date": "2024-01-01", "value": "1.0"},
                {"date": "2024-01-01", "value": "1.5"},
                {"date": "2024-01-02", "value": "2.0"}
            ]
        });
        let rows = FredAdapter::parse_observations("X", &body).expect("rows");
        let dates: Vec<NaiveDate> = rows.iter().map(Observation::date).collect();
        assert_eq!(dates, vec![date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3)]);
    }
}
