//! Transient staging tables for freshly fetched batches.
//!
//! Each invocation gets a uniquely named table so concurrent runs never
//! collide. The table enforces nothing; deduplication happens at merge.

use crate::error::classify;
use crate::schema::sanitize_identifier;
use anyhow::Result;
use async_trait::async_trait;
use econ_ingest_core::{Observation, ObservationBatch, SeriesKind, StagingHandle, StagingLoader};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, warn};
use uuid::Uuid;

const INSERT_CHUNK: usize = 100;

/// Postgres-backed [`StagingLoader`].
#[derive(Debug, Clone)]
pub struct StagingArea {
    pool: PgPool,
}

impl StagingArea {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn staging_table_name(series_id: &str) -> String {
        let uuid = Uuid::new_v4().simple().to_string();
        format!(
            "staging_{}_{}",
            sanitize_identifier(series_id),
            &uuid[..8]
        )
    }

    fn create_table_sql(table: &str, kind: SeriesKind) -> String {
        match kind {
            SeriesKind::Economic => format!(
                "CREATE TABLE {table} (series_id TEXT NOT NULL, date DATE NOT NULL, value DOUBLE PRECISION)"
            ),
            SeriesKind::Financial => format!(
                "CREATE TABLE {table} (series_id TEXT NOT NULL, date DATE NOT NULL, \
                 open DOUBLE PRECISION, high DOUBLE PRECISION, low DOUBLE PRECISION, \
                 close DOUBLE PRECISION, volume BIGINT)"
            ),
        }
    }

    /// Builds one multi-row INSERT for a chunk of observations. Rows of the
    /// wrong variant for `kind` are skipped; adapters guarantee homogeneous
    /// batches, so that never drops data in practice.
    fn insert_statement<'a>(
        table: &str,
        kind: SeriesKind,
        rows: &'a [Observation],
    ) -> QueryBuilder<'a, Postgres> {
        match kind {
            SeriesKind::Economic => {
                let mut builder = QueryBuilder::new(format!(
                    "INSERT INTO {table} (series_id, date, value) "
                ));
                builder.push_values(
                    rows.iter().filter_map(|row| match row {
                        Observation::Economic {
                            series_id,
                            date,
                            value,
                        } => Some((series_id, *date, *value)),
                        Observation::Financial { .. } => None,
                    }),
                    |mut b, (series_id, date, value)| {
                        b.push_bind(series_id).push_bind(date).push_bind(value);
                    },
                );
                builder
            }
            SeriesKind::Financial => {
                let mut builder = QueryBuilder::new(format!(
                    "INSERT INTO {table} (series_id, date, open, high, low, close, volume) "
                ));
                builder.push_values(
                    rows.iter().filter_map(|row| match row {
                        Observation::Financial {
                            series_id,
                            date,
                            open,
                            high,
                            low,
                            close,
                            volume,
                        } => Some((series_id, *date, *open, *high, *low, *close, *volume)),
                        Observation::Economic { .. } => None,
                    }),
                    |mut b, (series_id, date, open, high, low, close, volume)| {
                        b.push_bind(series_id)
                            .push_bind(date)
                            .push_bind(open)
                            .push_bind(high)
                            .push_bind(low)
                            .push_bind(close)
                            .push_bind(volume);
                    },
                );
                builder
            }
        }
    }
}

#[async_trait]
impl StagingLoader for StagingArea {
    async fn stage(&self, batch: &ObservationBatch) -> Result<StagingHandle> {
        let table = Self::staging_table_name(&batch.series_id);

        let mut tx = self.pool.begin().await.map_err(classify)?;
        sqlx::query(&Self::create_table_sql(&table, batch.kind))
            .execute(&mut *tx)
            .await
            .map_err(classify)?;

        for chunk in batch.rows.chunks(INSERT_CHUNK) {
            let mut statement = Self::insert_statement(&table, batch.kind, chunk);
            statement
                .build()
                .execute(&mut *tx)
                .await
                .map_err(classify)?;
        }

        tx.commit().await.map_err(classify)?;
        debug!(table, rows = batch.len(), "staged batch");

        Ok(StagingHandle {
            location: table,
            series_id: batch.series_id.clone(),
            kind: batch.kind,
            rows: batch.len(),
        })
    }

    async fn release(&self, handle: &StagingHandle) {
        let sql = format!("DROP TABLE IF EXISTS {}", handle.location);
        if let Err(err) = sqlx::query(&sql).execute(&self.pool).await {
            // Leaked staging tables waste space but never corrupt data.
            warn!(table = handle.location.as_str(), error = %err, "failed to drop staging table");
        } else {
            debug!(table = handle.location.as_str(), "released staging table");
        }
    }
}
