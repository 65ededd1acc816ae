//! Local CSV source adapter.
//!
//! Economic files carry a date column plus one column per series id; the
//! adapter scans the configured files for the column matching the requested
//! series. Financial files are dedicated to one series (keyed by its logical
//! source name) and carry OHLCV columns. Date formats differ per file and
//! are configured explicitly.

use async_trait::async_trait;
use chrono::NaiveDate;
use csv::StringRecord;
use econ_ingest_core::{
    CsvConfig, CsvFileConfig, FetchWindow, Observation, SeriesKind, SeriesMetadata, SourceAdapter,
    SourceError, SourceResult,
};
use std::path::Path;
use tracing::warn;

/// Registry key for this adapter.
pub const CSV_ORIGIN: &str = "csv";

const FINANCIAL_COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

pub struct CsvAdapter {
    config: CsvConfig,
}

impl CsvAdapter {
    #[must_use]
    pub fn new(config: CsvConfig) -> Self {
        Self { config }
    }

    /// Finds the file exposing the requested series.
    ///
    /// Financial series map directly to their logical source name. Economic
    /// series match either a column header or a two-column file whose source
    /// name is the series id.
    fn locate(&self, series_id: &str) -> SourceResult<&CsvFileConfig> {
        if self.config.kind == SeriesKind::Financial {
            return self
                .config
                .files
                .get(series_id)
                .ok_or_else(|| SourceError::not_found(series_id));
        }

        for (source_name, file) in &self.config.files {
            let headers = match read_headers(&file.path) {
                Ok(headers) => headers,
                Err(err) => {
                    warn!(source = source_name.as_str(), path = %file.path.display(), error = %err, "skipping unreadable CSV file");
                    continue;
                }
            };
            if headers.iter().any(|h| h == series_id) {
                return Ok(file);
            }
            if source_name == series_id && headers.len() == 2 && date_column(&headers).is_some() {
                return Ok(file);
            }
        }
        Err(SourceError::not_found(series_id))
    }

    fn read_economic(
        &self,
        series_id: &str,
        file: &CsvFileConfig,
    ) -> SourceResult<Vec<(NaiveDate, f64)>> {
        let mut reader = open_reader(&file.path)?;
        let headers = reader
            .headers()
            .map_err(|err| SourceError::malformed(format!("unreadable CSV headers: {err}")))?
            .clone();

        let date_idx = date_column(&headers).ok_or_else(|| {
            SourceError::malformed(format!(
                "no 'Date'/'date' column in {}",
                file.path.display()
            ))
        })?;
        let value_idx = headers
            .iter()
            .position(|h| h == series_id)
            .or_else(|| {
                // Two-column file dedicated to this series: the non-date
                // column is the data column regardless of its header.
                (headers.len() == 2).then(|| if date_idx == 0 { 1 } else { 0 })
            })
            .ok_or_else(|| SourceError::not_found(series_id))?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record
                .map_err(|err| SourceError::malformed(format!("unreadable CSV record: {err}")))?;
            let Some(date) = parse_date_cell(series_id, &record, date_idx, &file.date_format)
            else {
                continue;
            };
            let raw_value = record.get(value_idx).unwrap_or("");
            match raw_value.trim().parse::<f64>() {
                Ok(value) => rows.push((date, value)),
                Err(_) => {
                    warn!(series_id, %date, raw_value, "dropping non-numeric CSV value");
                }
            }
        }
        rows.sort_by_key(|(date, _)| *date);
        rows.dedup_by_key(|(date, _)| *date);
        Ok(rows)
    }

    fn read_financial(
        &self,
        series_id: &str,
        file: &CsvFileConfig,
    ) -> SourceResult<Vec<Observation>> {
        let mut reader = open_reader(&file.path)?;
        let headers = reader
            .headers()
            .map_err(|err| SourceError::malformed(format!("unreadable CSV headers: {err}")))?
            .clone();

        let mut indices = [0usize; 6];
        for (slot, column) in indices.iter_mut().zip(FINANCIAL_COLUMNS) {
            *slot = headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(column))
                .ok_or_else(|| {
                    SourceError::malformed(format!(
                        "financial CSV {} missing required column '{column}'",
                        file.path.display()
                    ))
                })?;
        }
        let [date_idx, open_idx, high_idx, low_idx, close_idx, volume_idx] = indices;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record
                .map_err(|err| SourceError::malformed(format!("unreadable CSV record: {err}")))?;
            let Some(date) = parse_date_cell(series_id, &record, date_idx, &file.date_format)
            else {
                continue;
            };

            let open = parse_f64_cell(&record, open_idx);
            let high = parse_f64_cell(&record, high_idx);
            let low = parse_f64_cell(&record, low_idx);
            let close = parse_f64_cell(&record, close_idx);
            let volume = parse_f64_cell(&record, volume_idx);
            let (Some(open), Some(high), Some(low), Some(close), Some(volume)) =
                (open, high, low, close, volume)
            else {
                warn!(series_id, %date, "dropping CSV bar with non-numeric field");
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

    fn all_dates(&self, series_id: &str, file: &CsvFileConfig) -> SourceResult<Vec<NaiveDate>> {
        match self.config.kind {
            SeriesKind::Economic => Ok(self
                .read_economic(series_id, file)?
                .into_iter()
                .map(|(date, _)| date)
                .collect()),
            SeriesKind::Financial => Ok(self
                .read_financial(series_id, file)?
                .iter()
                .map(Observation::date)
                .collect()),
        }
    }
}

fn open_reader(path: &Path) -> SourceResult<csv::Reader<std::fs::File>> {
    csv::Reader::from_path(path).map_err(|err| {
        SourceError::unavailable(format!("cannot open CSV file {}: {err}", path.display()))
    })
}

fn read_headers(path: &Path) -> SourceResult<StringRecord> {
    let mut reader = open_reader(path)?;
    reader
        .headers()
        .cloned()
        .map_err(|err| SourceError::malformed(format!("unreadable CSV headers: {err}")))
}

fn date_column(headers: &StringRecord) -> Option<usize> {
    headers.iter().position(|h| h == "Date" || h == "date")
}

fn parse_date_cell(
    series_id: &str,
    record: &StringRecord,
    idx: usize,
    format: &str,
) -> Option<NaiveDate> {
    let raw = record.get(idx).unwrap_or("").trim();
    match NaiveDate::parse_from_str(raw, format) {
        Ok(date) => Some(date),
        Err(_) => {
            warn!(series_id, raw, format, "dropping CSV row with unparseable date");
            None
        }
    }
}

fn parse_f64_cell(record: &StringRecord, idx: usize) -> Option<f64> {
    record.get(idx)?.trim().parse::<f64>().ok()
}

/// Maps the median day-gap between consecutive observations to a frequency
/// label.
fn infer_frequency(dates: &[NaiveDate]) -> &'static str {
    if dates.len() < 2 {
        return "Unknown";
    }
    let mut gaps: Vec<i64> = dates
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_days())
        .collect();
    gaps.sort_unstable();
    let median = gaps[gaps.len() / 2];
    match median {
        1..=3 => "Daily",
        4..=10 => "Weekly",
        25..=35 => "Monthly",
        80..=100 => "Quarterly",
        350..=380 => "Annual",
        _ => "Unknown",
    }
}

#[async_trait]
impl SourceAdapter for CsvAdapter {
    fn origin(&self) -> &str {
        CSV_ORIGIN
    }

    fn kind(&self) -> SeriesKind {
        self.config.kind
    }

    async fn fetch_metadata(&self, series_id: &str) -> SourceResult<SeriesMetadata> {
        let file = self.locate(series_id)?;
        let dates = self.all_dates(series_id, file)?;

        let mut metadata = SeriesMetadata::new(series_id, series_id);
        metadata.observation_start = dates.first().copied();
        metadata.observation_end = dates.last().copied();
        metadata.frequency = match self.config.kind {
            SeriesKind::Financial => "Daily".to_string(),
            SeriesKind::Economic => infer_frequency(&dates).to_string(),
        };
        metadata.notes = "Loaded from CSV file".to_string();
        Ok(metadata)
    }

    async fn fetch_observations(
        &self,
        series_id: &str,
        window: FetchWindow,
    ) -> SourceResult<Vec<Observation>> {
        let file = self.locate(series_id)?;
        let rows = match self.config.kind {
            SeriesKind::Economic => self
                .read_economic(series_id, file)?
                .into_iter()
                .map(|(date, value)| Observation::Economic {
                    series_id: series_id.to_string(),
                    date,
                    value,
                })
                .collect::<Vec<_>>(),
            SeriesKind::Financial => self.read_financial(series_id, file)?,
        };

        Ok(rows
            .into_iter()
            .filter(|obs| obs.date() >= window.start && obs.date() <= window.end)
            .collect())
    }
}
