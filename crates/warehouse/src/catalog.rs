//! Series catalog: descriptor storage and the per-series merge watermark.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use econ_ingest_core::{SeriesDescriptor, SeriesKind, SeriesMetadata, WatermarkStore};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use tracing::info;

/// Postgres-backed [`WatermarkStore`].
#[derive(Debug, Clone)]
pub struct SeriesCatalog {
    pool: PgPool,
}

impl SeriesCatalog {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lists every descriptor, ordered by series id.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn list_descriptors(&self) -> Result<Vec<SeriesDescriptor>> {
        let rows = sqlx::query_as::<_, DescriptorRow>(
            r"
            SELECT series_id, display_name, kind, origin, observation_start,
                   observation_end, frequency, units, seasonal_adjustment,
                   metadata, last_merged_date, last_refreshed_at
            FROM series_catalog
            ORDER BY series_id
            ",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list series descriptors")?;

        rows.into_iter().map(DescriptorRow::into_descriptor).collect()
    }
}

#[async_trait]
impl WatermarkStore for SeriesCatalog {
    async fn get_descriptor(&self, series_id: &str) -> Result<Option<SeriesDescriptor>> {
        let row = sqlx::query_as::<_, DescriptorRow>(
            r"
            SELECT series_id, display_name, kind, origin, observation_start,
                   observation_end, frequency, units, seasonal_adjustment,
                   metadata, last_merged_date, last_refreshed_at
            FROM series_catalog
            WHERE series_id = $1
            ",
        )
        .bind(series_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to query series descriptor")?;

        row.map(DescriptorRow::into_descriptor).transpose()
    }

    async fn upsert_metadata(
        &self,
        series_id: &str,
        metadata: &SeriesMetadata,
        kind: SeriesKind,
        origin: &str,
    ) -> Result<SeriesDescriptor> {
        let blob = serde_json::to_value(metadata).context("Failed to serialize metadata blob")?;

        let row = sqlx::query_as::<_, DescriptorRow>(
            r"
            INSERT INTO series_catalog
                (series_id, display_name, kind, origin, observation_start,
                 observation_end, frequency, units, seasonal_adjustment, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (series_id) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                kind = EXCLUDED.kind,
                origin = EXCLUDED.origin,
                observation_start = EXCLUDED.observation_start,
                observation_end = EXCLUDED.observation_end,
                frequency = EXCLUDED.frequency,
                units = EXCLUDED.units,
                seasonal_adjustment = EXCLUDED.seasonal_adjustment,
                metadata = EXCLUDED.metadata
            RETURNING series_id, display_name, kind, origin, observation_start,
                      observation_end, frequency, units, seasonal_adjustment,
                      metadata, last_merged_date, last_refreshed_at
            ",
        )
        .bind(series_id)
        .bind(&metadata.title)
        .bind(kind.as_str())
        .bind(origin)
        .bind(metadata.observation_start)
        .bind(metadata.observation_end)
        .bind(&metadata.frequency)
        .bind(&metadata.units)
        .bind(&metadata.seasonal_adjustment)
        .bind(blob)
        .fetch_one(&self.pool)
        .await
        .context("Failed to upsert series metadata")?;

        info!(series_id, origin, kind = kind.as_str(), "series metadata upserted");
        row.into_descriptor()
    }

    async fn advance_watermark(
        &self,
        series_id: &str,
        new_last_date: NaiveDate,
        refreshed_at: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            r"
            UPDATE series_catalog
            SET last_merged_date = $2, last_refreshed_at = $3
            WHERE series_id = $1
            ",
        )
        .bind(series_id)
        .bind(new_last_date)
        .bind(refreshed_at)
        .execute(&self.pool)
        .await
        .context("Failed to advance watermark")?;

        anyhow::ensure!(
            result.rows_affected() == 1,
            "cannot advance watermark for unknown series {series_id}"
        );
        info!(series_id, %new_last_date, "watermark advanced");
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DescriptorRow {
    series_id: String,
    display_name: String,
    kind: String,
    origin: String,
    observation_start: Option<NaiveDate>,
    observation_end: Option<NaiveDate>,
    frequency: String,
    units: String,
    seasonal_adjustment: String,
    metadata: JsonValue,
    last_merged_date: Option<NaiveDate>,
    last_refreshed_at: Option<DateTime<Utc>>,
}

impl DescriptorRow {
    fn into_descriptor(self) -> Result<SeriesDescriptor> {
        Ok(SeriesDescriptor {
            kind: self.kind.parse()?,
            series_id: self.series_id,
            display_name: self.display_name,
            origin: self.origin,
            observation_start: self.observation_start,
            observation_end: self.observation_end,
            frequency: self.frequency,
            units: self.units,
            seasonal_adjustment: self.seasonal_adjustment,
            metadata: self.metadata,
            last_merged_date: self.last_merged_date,
            last_refreshed_at: self.last_refreshed_at,
        })
    }
}
