//! Trait seams between the pipeline and its collaborators.
//!
//! Source adapters normalize heterogeneous upstreams into the common
//! observation shape; the warehouse traits cover the staging/merge protocol
//! and the per-series watermark record.

use crate::error::SourceResult;
use crate::types::{
    FetchWindow, Observation, ObservationBatch, SeriesDescriptor, SeriesKind, SeriesMetadata,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

/// A connector to one upstream data provider.
///
/// Implementations must return observations ordered by date with no
/// duplicate dates, covering the closed interval given by the window.
/// Scalars that fail numeric parsing are dropped with a warning; a shape
/// violation (missing keys) is a `MalformedResponse` error.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Registry key for this adapter (e.g. "fred", "polygon", "csv").
    fn origin(&self) -> &str;

    /// The kind of observations this adapter produces.
    fn kind(&self) -> SeriesKind;

    /// Fetches normalized metadata for a series. Never returns partial
    /// metadata.
    async fn fetch_metadata(&self, series_id: &str) -> SourceResult<SeriesMetadata>;

    /// Fetches observations for a series within the closed window.
    async fn fetch_observations(
        &self,
        series_id: &str,
        window: FetchWindow,
    ) -> SourceResult<Vec<Observation>>;
}

/// Per-series catalog record holding current metadata and the merge
/// watermark. Read before fetch, written after a successful merge.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    async fn get_descriptor(&self, series_id: &str) -> Result<Option<SeriesDescriptor>>;

    /// Create-or-update: the descriptor is the single source of truth for
    /// current metadata, so later calls overwrite prior values. The
    /// watermark columns are untouched.
    async fn upsert_metadata(
        &self,
        series_id: &str,
        metadata: &SeriesMetadata,
        kind: SeriesKind,
        origin: &str,
    ) -> Result<SeriesDescriptor>;

    /// Persists the new high-water mark. Called only after the merge
    /// commits; a failure here just means the same window is re-fetched and
    /// re-merged next run, which the idempotent merge makes safe.
    async fn advance_watermark(
        &self,
        series_id: &str,
        new_last_date: NaiveDate,
        refreshed_at: DateTime<Utc>,
    ) -> Result<()>;
}

/// Handle to a transient staging area holding one batch of rows.
#[derive(Debug, Clone)]
pub struct StagingHandle {
    /// Backend-specific staging location, unique per invocation.
    pub location: String,
    pub series_id: String,
    pub kind: SeriesKind,
    /// Number of rows staged.
    pub rows: usize,
}

/// Writes a fetched batch into a transient staging area.
///
/// No uniqueness is enforced at this layer; deduplication happens at merge.
/// Every handle returned by `stage` must be passed to `release` on all exit
/// paths, success or failure.
#[async_trait]
pub trait StagingLoader: Send + Sync {
    async fn stage(&self, batch: &ObservationBatch) -> Result<StagingHandle>;

    /// Best-effort cleanup of the staging area. Failures are logged by the
    /// implementation, not propagated.
    async fn release(&self, handle: &StagingHandle);
}

/// Insert-only merge from staging into the permanent table.
///
/// Rows whose (series_id, date) key already exists in the destination are
/// left untouched, so re-merging the same staging batch inserts zero rows.
#[async_trait]
pub trait MergeEngine: Send + Sync {
    /// Returns the number of rows actually inserted.
    async fn merge(&self, handle: &StagingHandle) -> Result<u64>;
}
