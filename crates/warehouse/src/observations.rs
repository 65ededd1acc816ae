//! Read-back queries over the permanent observation tables.
//!
//! Used for round-trip verification and by downstream consumers of the
//! warehouse; the pipeline itself only writes.

use crate::schema::destination_table;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use econ_ingest_core::{Observation, SeriesKind};
use sqlx::PgPool;

#[derive(Debug, Clone)]
pub struct ObservationReader {
    pool: PgPool,
}

impl ObservationReader {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Queries observations for a series within a closed date range,
    /// ordered by date.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_observations(
        &self,
        series_id: &str,
        kind: SeriesKind,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Observation>> {
        match kind {
            SeriesKind::Economic => {
                let rows: Vec<(String, NaiveDate, f64)> = sqlx::query_as(
                    r"
                    SELECT series_id, date, value
                    FROM economic_observations
                    WHERE series_id = $1 AND date >= $2 AND date <= $3
                    ORDER BY date ASC
                    ",
                )
                .bind(series_id)
                .bind(start)
                .bind(end)
                .fetch_all(&self.pool)
                .await
                .context("Failed to query economic observations")?;

                Ok(rows
                    .into_iter()
                    .map(|(series_id, date, value)| Observation::Economic {
                        series_id,
                        date,
                        value,
                    })
                    .collect())
            }
            SeriesKind::Financial => {
                let rows: Vec<(String, NaiveDate, f64, f64, f64, f64, i64)> = sqlx::query_as(
                    r"
                    SELECT series_id, date, open, high, low, close, volume
                    FROM financial_observations
                    WHERE series_id = $1 AND date >= $2 AND date <= $3
                    ORDER BY date ASC
                    ",
                )
                .bind(series_id)
                .bind(start)
                .bind(end)
                .fetch_all(&self.pool)
                .await
                .context("Failed to query financial observations")?;

                Ok(rows
                    .into_iter()
                    .map(
                        |(series_id, date, open, high, low, close, volume)| {
                            Observation::Financial {
                                series_id,
                                date,
                                open,
                                high,
                                low,
                                close,
                                volume,
                            }
                        },
                    )
                    .collect())
            }
        }
    }

    /// The latest merged date for a series, or None when no rows exist.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn latest_observation_date(
        &self,
        series_id: &str,
        kind: SeriesKind,
    ) -> Result<Option<NaiveDate>> {
        let sql = format!(
            "SELECT MAX(date) FROM {} WHERE series_id = $1",
            destination_table(kind)
        );
        let row: (Option<NaiveDate>,) = sqlx::query_as(&sql)
            .bind(series_id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to query latest observation date")?;
        Ok(row.0)
    }

    /// Counts merged observations for a series.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn count_observations(&self, series_id: &str, kind: SeriesKind) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE series_id = $1",
            destination_table(kind)
        );
        let row: (i64,) = sqlx::query_as(&sql)
            .bind(series_id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count observations")?;
        Ok(row.0)
    }
}
