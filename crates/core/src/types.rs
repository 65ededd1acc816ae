//! Core data model for the ingestion pipeline.
//!
//! Series metadata, normalized observations, and the incremental fetch
//! window derived from a series' watermark.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

/// Whether a series carries single-valued economic observations or
/// OHLCV financial bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    Economic,
    Financial,
}

impl SeriesKind {
    /// Returns the string representation used in configs and the catalog.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesKind::Economic => "economic",
            SeriesKind::Financial => "financial",
        }
    }
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeriesKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "economic" => Ok(SeriesKind::Economic),
            "financial" => Ok(SeriesKind::Financial),
            other => anyhow::bail!("unknown series kind: {other}"),
        }
    }
}

/// Normalized series metadata as returned by any source adapter.
///
/// The named fields are the required surface; `extra` is an additive,
/// schema-less side channel preserved on the descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesMetadata {
    pub series_id: String,
    pub title: String,
    pub observation_start: Option<NaiveDate>,
    pub observation_end: Option<NaiveDate>,
    pub frequency: String,
    pub units: String,
    pub seasonal_adjustment: String,
    pub last_updated: Option<DateTime<Utc>>,
    pub notes: String,
    #[serde(default)]
    pub extra: serde_json::Map<String, JsonValue>,
}

impl SeriesMetadata {
    /// Creates metadata with only the required identity fields set.
    #[must_use]
    pub fn new(series_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            series_id: series_id.into(),
            title: title.into(),
            observation_start: None,
            observation_end: None,
            frequency: "N/A".to_string(),
            units: "N/A".to_string(),
            seasonal_adjustment: "N/A".to_string(),
            last_updated: None,
            notes: String::new(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Catalog record for one series: current metadata plus the merge watermark.
///
/// Owned by the watermark store. Created on first successful metadata fetch,
/// metadata fields overwritten on every subsequent upsert, never deleted by
/// the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesDescriptor {
    pub series_id: String,
    pub display_name: String,
    pub kind: SeriesKind,
    pub origin: String,
    pub observation_start: Option<NaiveDate>,
    pub observation_end: Option<NaiveDate>,
    pub frequency: String,
    pub units: String,
    pub seasonal_adjustment: String,
    /// Free-form metadata blob from the source, additive only.
    pub metadata: JsonValue,
    /// Latest date already merged into the warehouse for this series.
    pub last_merged_date: Option<NaiveDate>,
    pub last_refreshed_at: Option<DateTime<Utc>>,
}

/// A single normalized observation.
///
/// All rows in one fetched batch are the same variant; the batch carries
/// its [`SeriesKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Observation {
    Economic {
        series_id: String,
        date: NaiveDate,
        value: f64,
    },
    Financial {
        series_id: String,
        date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: i64,
    },
}

impl Observation {
    #[must_use]
    pub fn series_id(&self) -> &str {
        match self {
            Observation::Economic { series_id, .. } | Observation::Financial { series_id, .. } => {
                series_id
            }
        }
    }

    #[must_use]
    pub fn date(&self) -> NaiveDate {
        match self {
            Observation::Economic { date, .. } | Observation::Financial { date, .. } => *date,
        }
    }

    #[must_use]
    pub fn kind(&self) -> SeriesKind {
        match self {
            Observation::Economic { .. } => SeriesKind::Economic,
            Observation::Financial { .. } => SeriesKind::Financial,
        }
    }
}

/// A batch of observations fetched for one series in one run.
#[derive(Debug, Clone)]
pub struct ObservationBatch {
    pub series_id: String,
    pub kind: SeriesKind,
    pub rows: Vec<Observation>,
}

impl ObservationBatch {
    #[must_use]
    pub fn new(series_id: impl Into<String>, kind: SeriesKind, rows: Vec<Observation>) -> Self {
        Self {
            series_id: series_id.into(),
            kind,
            rows,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The latest observation date in the batch, i.e. the watermark
    /// candidate after a successful merge.
    #[must_use]
    pub fn max_date(&self) -> Option<NaiveDate> {
        self.rows.iter().map(Observation::date).max()
    }

    /// Drops rows at or before the watermark. Upstreams occasionally replay
    /// history, so staged rows must stay strictly inside the fetch window.
    pub fn retain_after(&mut self, watermark: NaiveDate) {
        self.rows.retain(|obs| obs.date() > watermark);
    }
}

/// Closed date interval `[start, end]` to request from a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FetchWindow {
    #[must_use]
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// True when start > end: the series is already current and the source
    /// should not be contacted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Computes the incremental window for a series.
    ///
    /// With a watermark the window starts the day after it. Without one it
    /// starts `default_lookback_days` before `today`, clamped forward to the
    /// series' stated `observation_start` when that is later.
    #[must_use]
    pub fn resolve(
        last_merged_date: Option<NaiveDate>,
        observation_start: Option<NaiveDate>,
        default_lookback_days: i64,
        today: NaiveDate,
    ) -> Self {
        let start = match last_merged_date {
            Some(watermark) => watermark + Duration::days(1),
            None => {
                let fallback = today - Duration::days(default_lookback_days);
                match observation_start {
                    Some(stated) if stated > fallback => stated,
                    _ => fallback,
                }
            }
        };
        Self { start, end: today }
    }
}

impl fmt::Display for FetchWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}
