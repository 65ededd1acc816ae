//! Polygon market-data source adapter.
//!
//! Ticker metadata comes from the v3 reference endpoint, daily OHLCV bars
//! from the v2 aggregates endpoint. Aggregate timestamps are epoch
//! milliseconds and are converted to UTC calendar dates.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use econ_ingest_core::{
    FetchWindow, Observation, PolygonConfig, RetryingHttpClient, SeriesKind, SeriesMetadata,
    SourceAdapter, SourceError, SourceResult,
};
use serde_json::Value as JsonValue;
use tracing::warn;

/// Registry key for this adapter.
pub const POLYGON_ORIGIN: &str = "polygon";

const DATE_FORMAT: &str = "%Y-%m-%d";
const BAR_KEYS: [&str; 6] = ["t", "o", "h", "l", "c", "v"];

pub struct PolygonAdapter {
    config: PolygonConfig,
    http: RetryingHttpClient,
}

impl PolygonAdapter {
    #[must_use]
    pub fn new(config: PolygonConfig, http: RetryingHttpClient) -> Self {
        Self { config, http }
    }

    fn parse_metadata(body: &JsonValue) -> SourceResult<SeriesMetadata> {
        let results = body.get("results").ok_or_else(|| {
            SourceError::malformed(format!("missing 'results' object in response: {body}"))
        })?;

        let ticker = results
            .get("ticker")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| {
                SourceError::malformed(format!("ticker metadata missing 'ticker': {results}"))
            })?;
        let title = results
            .get("name")
            .and_then(JsonValue::as_str)
            .unwrap_or(ticker);

        let mut metadata = SeriesMetadata::new(ticker, title);
        metadata.frequency = "Daily".to_string();
        metadata.units = results
            .get("currency_name")
            .and_then(JsonValue::as_str)
            .unwrap_or("N/A")
            .to_string();
        metadata.notes = results
            .get("description")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string();
        if let Some(list_date) = results.get("list_date").and_then(JsonValue::as_str) {
            // list_date is the closest thing the reference endpoint has to
            // an observation start.
            metadata.observation_start =
                NaiveDate::parse_from_str(list_date, DATE_FORMAT).ok();
        }
        if let Some(obj) = results.as_object() {
            metadata.extra = obj.clone();
        }

        Ok(metadata)
    }

    fn parse_observations(series_id: &str, body: &JsonValue) -> SourceResult<Vec<Observation>> {
        let items = match body.get("results") {
            // A known ticker with no bars in the window returns no results
            // at all; that is an empty batch, not an error.
            None => return Ok(Vec::new()),
            Some(value) => value.as_array().ok_or_else(|| {
                SourceError::malformed(format!("'results' is not an array: {body}"))
            })?,
        };

        let mut rows = Vec::with_capacity(items.len());
        for item in items {
            for key in BAR_KEYS {
                if item.get(key).is_none() {
                    return Err(SourceError::malformed(format!(
                        "aggregate bar missing '{key}': {item}"
                    )));
                }
            }

            let Some(timestamp_ms) = item["t"].as_i64() else {
                warn!(series_id, bar = %item, "dropping bar with non-numeric timestamp");
                continue;
            };
            let Some(date) = DateTime::from_timestamp_millis(timestamp_ms)
                .map(|ts| ts.date_naive())
            else {
                warn!(series_id, timestamp_ms, "dropping bar with out-of-range timestamp");
                continue;
            };

            let open = item["o"].as_f64();
            let high = item["h"].as_f64();
            let low = item["l"].as_f64();
            let close = item["c"].as_f64();
            let volume = item["v"].as_f64();
            let (Some(open), Some(high), Some(low), Some(close), Some(volume)) =
                (open, high, low, close, volume)
            else {
                warn!(series_id, %date, bar = %item, "dropping bar with non-numeric field");
                continue;
            };

            rows.push(Observation::Financial {
                series_id: series_id.to_string(),
                date,
                open,
                high,
                low,
                close,
                volume: volume as i64,
            });
        }

        rows.sort_by_key(Observation::date);
        rows.dedup_by_key(|obs| obs.date());
        Ok(rows)
    }
}

#[async_trait]
impl SourceAdapter for PolygonAdapter {
    fn origin(&self) -> &str {
        POLYGON_ORIGIN
    }

    fn kind(&self) -> SeriesKind {
        SeriesKind::Financial
    }

    async fn fetch_metadata(&self, series_id: &str) -> SourceResult<SeriesMetadata> {
        let url = format!("{}/v3/reference/tickers/{series_id}", self.config.base_url);
        let query = [("apiKey", self.config.api_key.clone())];
        let body = self.http.get_json(series_id, &url, &query).await?;
        Self::parse_metadata(&body)
    }

    async fn fetch_observations(
        &self,
        series_id: &str,
        window: FetchWindow,
    ) -> SourceResult<Vec<Observation>> {
        let url = format!(
            "{}/v2/aggs/ticker/{series_id}/range/1/day/{}/{}",
            self.config.base_url,
            window.start.format(DATE_FORMAT),
            window.end.format(DATE_FORMAT),
        );
        let query = [
            ("adjusted", "true".to_string()),
            ("sort", "asc".to_string()),
            ("limit", "50000".to_string()),
            ("apiKey", self.config.api_key.clone()),
        ];
        let body = self.http.get_json(series_id, &url, &query).await?;
        Self::parse_observations(series_id, &body)
    }
}
