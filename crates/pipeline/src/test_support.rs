//! In-memory fakes for the core trait seams, shared by the workflow and
//! driver tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use econ_ingest_core::{
    FetchWindow, MergeEngine, Observation, ObservationBatch, SeriesDescriptor, SeriesKind,
    SeriesMetadata, SourceAdapter, SourceError, SourceResult, StagingHandle, StagingLoader,
    WatermarkStore,
};

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Adapter backed by a fixed table of dates and values. Serves any series
/// id, stamping requested ids onto the rows it returns.
pub(crate) struct FakeAdapter {
    origin: String,
    kind: SeriesKind,
    values: Mutex<Vec<(NaiveDate, f64)>>,
    bars: Mutex<Vec<(NaiveDate, (f64, f64, f64, f64, i64))>>,
    ignore_window: bool,
    fail_observations: bool,
    fail_metadata: bool,
    metadata_calls: AtomicUsize,
    observation_calls: AtomicUsize,
    last_window: Mutex<Option<FetchWindow>>,
}

impl FakeAdapter {
    pub(crate) fn new(origin: &str, kind: SeriesKind) -> Self {
        Self {
            origin: origin.to_string(),
            kind,
            values: Mutex::new(Vec::new()),
            bars: Mutex::new(Vec::new()),
            ignore_window: false,
            fail_observations: false,
            fail_metadata: false,
            metadata_calls: AtomicUsize::new(0),
            observation_calls: AtomicUsize::new(0),
            last_window: Mutex::new(None),
        }
    }

    pub(crate) fn with_values(
        self,
        values: impl IntoIterator<Item = (NaiveDate, f64)>,
    ) -> Self {
        self.values.lock().unwrap().extend(values);
        self
    }

    pub(crate) fn with_bars(
        self,
        bars: impl IntoIterator<Item = (NaiveDate, (f64, f64, f64, f64, i64))>,
    ) -> Self {
        self.bars.lock().unwrap().extend(bars);
        self
    }

    /// Serve the whole table regardless of the requested window, like an
    /// upstream that replays full history.
    pub(crate) fn ignore_window(mut self) -> Self {
        self.ignore_window = true;
        self
    }

    pub(crate) fn fail_observations(mut self) -> Self {
        self.fail_observations = true;
        self
    }

    pub(crate) fn fail_metadata(mut self) -> Self {
        self.fail_metadata = true;
        self
    }

    pub(crate) fn push_values(&self, values: impl IntoIterator<Item = (NaiveDate, f64)>) {
        self.values.lock().unwrap().extend(values);
    }

    pub(crate) fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn observation_calls(&self) -> usize {
        self.observation_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_window(&self) -> Option<FetchWindow> {
        *self.last_window.lock().unwrap()
    }
}

#[async_trait]
impl SourceAdapter for FakeAdapter {
    fn origin(&self) -> &str {
        &self.origin
    }

    fn kind(&self) -> SeriesKind {
        self.kind
    }

    async fn fetch_metadata(&self, series_id: &str) -> SourceResult<SeriesMetadata> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_metadata {
            return Err(SourceError::not_found(series_id));
        }
        Ok(SeriesMetadata::new(series_id, format!("{series_id} (test)")))
    }

    async fn fetch_observations(
        &self,
        series_id: &str,
        window: FetchWindow,
    ) -> SourceResult<Vec<Observation>> {
        self.observation_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_window.lock().unwrap() = Some(window);
        if self.fail_observations {
            return Err(SourceError::unavailable("fake upstream down"));
        }
        let in_window =
            |d: NaiveDate| self.ignore_window || (d >= window.start && d <= window.end);
        let mut rows: Vec<Observation> = self
            .values
            .lock()
            .unwrap()
            .iter()
            .filter(|(d, _)| in_window(*d))
            .map(|(date, value)| Observation::Economic {
                series_id: series_id.to_string(),
                date: *date,
                value: *value,
            })
            .collect();
        rows.extend(self.bars.lock().unwrap().iter().filter(|(d, _)| in_window(*d)).map(
            |(date, (open, high, low, close, volume))| Observation::Financial {
                series_id: series_id.to_string(),
                date: *date,
                open: *open,
                high: *high,
                low: *low,
                close: *close,
                volume: *volume,
            },
        ));
        rows.sort_by_key(Observation::date);
        Ok(rows)
    }
}

/// Watermark store over a plain map.
#[derive(Default)]
pub(crate) struct MemoryStore {
    descriptors: Mutex<HashMap<String, SeriesDescriptor>>,
}

impl MemoryStore {
    pub(crate) fn descriptor(&self, series_id: &str) -> Option<SeriesDescriptor> {
        self.descriptors.lock().unwrap().get(series_id).cloned()
    }
}

#[async_trait]
impl WatermarkStore for MemoryStore {
    async fn get_descriptor(&self, series_id: &str) -> Result<Option<SeriesDescriptor>> {
        Ok(self.descriptors.lock().unwrap().get(series_id).cloned())
    }

    async fn upsert_metadata(
        &self,
        series_id: &str,
        metadata: &SeriesMetadata,
        kind: SeriesKind,
        origin: &str,
    ) -> Result<SeriesDescriptor> {
        let mut descriptors = self.descriptors.lock().unwrap();
        let existing = descriptors.get(series_id);
        let descriptor = SeriesDescriptor {
            series_id: series_id.to_string(),
            display_name: metadata.title.clone(),
            kind,
            origin: origin.to_string(),
            observation_start: metadata.observation_start,
            observation_end: metadata.observation_end,
            frequency: metadata.frequency.clone(),
            units: metadata.units.clone(),
            seasonal_adjustment: metadata.seasonal_adjustment.clone(),
            metadata: serde_json::to_value(metadata)?,
            last_merged_date: existing.and_then(|d| d.last_merged_date),
            last_refreshed_at: existing.and_then(|d| d.last_refreshed_at),
        };
        descriptors.insert(series_id.to_string(), descriptor.clone());
        Ok(descriptor)
    }

    async fn advance_watermark(
        &self,
        series_id: &str,
        new_last_date: NaiveDate,
        refreshed_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut descriptors = self.descriptors.lock().unwrap();
        let descriptor = descriptors
            .get_mut(series_id)
            .ok_or_else(|| anyhow!("no descriptor for {series_id}"))?;
        descriptor.last_merged_date = Some(new_last_date);
        descriptor.last_refreshed_at = Some(refreshed_at);
        Ok(())
    }
}

#[derive(Default)]
struct WarehouseState {
    rows: BTreeMap<(String, NaiveDate), Observation>,
    staged: HashMap<String, Vec<Observation>>,
    next_id: usize,
    last_staged: usize,
    fail_next_merge: bool,
    fail_stage: bool,
}

/// Staging area and insert-only merger over one shared map, keyed by
/// (series_id, date) like the permanent tables.
#[derive(Default)]
pub(crate) struct MemoryWarehouse {
    state: Mutex<WarehouseState>,
}

impl MemoryWarehouse {
    pub(crate) fn row_count(&self) -> usize {
        self.state.lock().unwrap().rows.len()
    }

    pub(crate) fn rows_for(&self, series_id: &str) -> Vec<Observation> {
        self.state
            .lock()
            .unwrap()
            .rows
            .iter()
            .filter(|((id, _), _)| id == series_id)
            .map(|(_, obs)| obs.clone())
            .collect()
    }

    /// Staging areas created but not yet released.
    pub(crate) fn unreleased_stagings(&self) -> usize {
        self.state.lock().unwrap().staged.len()
    }

    pub(crate) fn last_staged_rows(&self) -> usize {
        self.state.lock().unwrap().last_staged
    }

    pub(crate) fn fail_next_merge(&self) {
        self.state.lock().unwrap().fail_next_merge = true;
    }

    pub(crate) fn fail_stage(&self) {
        self.state.lock().unwrap().fail_stage = true;
    }
}

#[async_trait]
impl StagingLoader for MemoryWarehouse {
    async fn stage(&self, batch: &ObservationBatch) -> Result<StagingHandle> {
        let mut state = self.state.lock().unwrap();
        if state.fail_stage {
            return Err(anyhow!("staging unavailable"));
        }
        state.next_id += 1;
        let location = format!("staging_{}", state.next_id);
        state.staged.insert(location.clone(), batch.rows.clone());
        state.last_staged = batch.len();
        Ok(StagingHandle {
            location,
            series_id: batch.series_id.clone(),
            kind: batch.kind,
            rows: batch.len(),
        })
    }

    async fn release(&self, handle: &StagingHandle) {
        self.state.lock().unwrap().staged.remove(&handle.location);
    }
}

#[async_trait]
impl MergeEngine for MemoryWarehouse {
    async fn merge(&self, handle: &StagingHandle) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        if state.fail_next_merge {
            state.fail_next_merge = false;
            return Err(anyhow!("merge rejected"));
        }
        let staged = state
            .staged
            .get(&handle.location)
            .cloned()
            .ok_or_else(|| anyhow!("unknown staging location {}", handle.location))?;
        let mut inserted = 0u64;
        for obs in staged {
            let key = (obs.series_id().to_string(), obs.date());
            if let std::collections::btree_map::Entry::Vacant(slot) = state.rows.entry(key) {
                slot.insert(obs);
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}
