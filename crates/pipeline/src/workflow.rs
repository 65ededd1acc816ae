//! Per-series fetch-and-merge workflow.
//!
//! A single series run walks a fixed sequence of stages: resolve the
//! watermark, fetch the incremental window, stage the batch, merge it, and
//! advance the watermark. A failure at any stage stops that series and is
//! reported against the stage where it happened; the staging area is
//! released on every exit path after it has been created.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use econ_ingest_core::{
    FetchWindow, IngestConfig, MergeEngine, ObservationBatch, SeriesKind, SourceAdapter,
    StagingLoader, WatermarkStore,
};

/// Shared collaborators for every series in a run.
pub struct IngestContext {
    pub store: Arc<dyn WatermarkStore>,
    pub staging: Arc<dyn StagingLoader>,
    pub merger: Arc<dyn MergeEngine>,
    pub config: IngestConfig,
}

/// One series requested in a batch run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeriesSpec {
    pub series_id: String,
    pub origin: String,
    pub kind: SeriesKind,
}

/// Stage of the per-series workflow, used to attribute failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    ResolveWatermark,
    Fetch,
    Stage,
    Merge,
    AdvanceWatermark,
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IngestStage::ResolveWatermark => "resolve_watermark",
            IngestStage::Fetch => "fetch",
            IngestStage::Stage => "stage",
            IngestStage::Merge => "merge",
            IngestStage::AdvanceWatermark => "advance_watermark",
        };
        f.write_str(name)
    }
}

/// Terminal status of one series run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesStatus {
    /// The merge committed and the watermark advanced.
    Completed { rows_inserted: u64 },
    /// Nothing new upstream: empty window or empty batch after the
    /// watermark guard. No staging or merge happened.
    UpToDate,
    Failed {
        stage: IngestStage,
        error: String,
    },
}

/// Result of one series run, for the end-of-run report.
#[derive(Debug, Clone)]
pub struct SeriesOutcome {
    pub series_id: String,
    pub status: SeriesStatus,
    pub elapsed: Duration,
}

impl SeriesOutcome {
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self.status, SeriesStatus::Failed { .. })
    }
}

/// Runs the full workflow for one series.
///
/// `today` is the inclusive end of the fetch window; the batch driver passes
/// the current UTC date. Failures never leave a partially advanced
/// watermark: the watermark moves only after the merge has committed.
pub async fn ingest_series(
    adapter: &dyn SourceAdapter,
    ctx: &IngestContext,
    spec: &SeriesSpec,
    today: NaiveDate,
) -> SeriesOutcome {
    let started = Instant::now();
    let status = match run_stages(adapter, ctx, spec, today).await {
        Ok(status) => status,
        Err((stage, error)) => {
            warn!(
                series_id = %spec.series_id,
                %stage,
                error = %error,
                "series ingestion failed"
            );
            SeriesStatus::Failed {
                stage,
                error: format!("{error:#}"),
            }
        }
    };
    SeriesOutcome {
        series_id: spec.series_id.clone(),
        status,
        elapsed: started.elapsed(),
    }
}

async fn run_stages(
    adapter: &dyn SourceAdapter,
    ctx: &IngestContext,
    spec: &SeriesSpec,
    today: NaiveDate,
) -> Result<SeriesStatus, (IngestStage, anyhow::Error)> {
    let descriptor = ctx
        .store
        .get_descriptor(&spec.series_id)
        .await
        .map_err(|e| (IngestStage::ResolveWatermark, e))?;

    // First sighting of a series: fetch metadata and create its catalog
    // record. Existing series keep their stored metadata between refreshes.
    let descriptor = match descriptor {
        Some(descriptor) => descriptor,
        None => {
            info!(series_id = %spec.series_id, origin = %spec.origin, "new series, fetching metadata");
            let metadata = adapter
                .fetch_metadata(&spec.series_id)
                .await
                .map_err(|e| (IngestStage::Fetch, anyhow!(e)))?;
            ctx.store
                .upsert_metadata(&spec.series_id, &metadata, spec.kind, &spec.origin)
                .await
                .map_err(|e| (IngestStage::ResolveWatermark, e))?
        }
    };

    let window = FetchWindow::resolve(
        descriptor.last_merged_date,
        descriptor.observation_start,
        ctx.config.default_lookback_days,
        today,
    );
    if window.is_empty() {
        debug!(series_id = %spec.series_id, %window, "window is empty, series is current");
        return Ok(SeriesStatus::UpToDate);
    }

    debug!(series_id = %spec.series_id, %window, "fetching observations");
    let rows = adapter
        .fetch_observations(&spec.series_id, window)
        .await
        .map_err(|e| (IngestStage::Fetch, anyhow!(e)))?;

    let mut batch = ObservationBatch::new(&spec.series_id, spec.kind, rows);
    // Upstreams occasionally replay history past the requested start.
    if let Some(watermark) = descriptor.last_merged_date {
        batch.retain_after(watermark);
    }
    if batch.is_empty() {
        info!(series_id = %spec.series_id, %window, "no new observations");
        return Ok(SeriesStatus::UpToDate);
    }
    // Non-empty after retain_after, so a max date exists.
    let Some(new_watermark) = batch.max_date() else {
        return Err((
            IngestStage::Stage,
            anyhow!("batch reported non-empty but has no max date"),
        ));
    };

    let handle = ctx
        .staging
        .stage(&batch)
        .await
        .map_err(|e| (IngestStage::Stage, e))?;

    let merge_result = ctx.merger.merge(&handle).await;
    ctx.staging.release(&handle).await;
    let rows_inserted = merge_result.map_err(|e| (IngestStage::Merge, e))?;

    ctx.store
        .advance_watermark(&spec.series_id, new_watermark, Utc::now())
        .await
        .map_err(|e| (IngestStage::AdvanceWatermark, e))?;

    info!(
        series_id = %spec.series_id,
        rows_fetched = batch.len(),
        rows_inserted,
        watermark = %new_watermark,
        "series ingested"
    );
    Ok(SeriesStatus::Completed { rows_inserted })
}
