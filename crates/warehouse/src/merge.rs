//! Insert-only merge from staging into the permanent tables.
//!
//! A set-difference insert: rows whose (series_id, date) key already exists
//! in the destination are left untouched, so updates to historical values
//! are never applied and re-merging the same batch is a no-op.

use crate::error::classify;
use crate::schema::destination_table;
use anyhow::Result;
use async_trait::async_trait;
use econ_ingest_core::{MergeEngine, SeriesKind, StagingHandle};
use sqlx::PgPool;
use tracing::info;

/// Postgres-backed [`MergeEngine`].
#[derive(Debug, Clone)]
pub struct InsertOnlyMerger {
    pool: PgPool,
}

impl InsertOnlyMerger {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn merge_sql(staging_table: &str, kind: SeriesKind) -> String {
        let destination = destination_table(kind);
        // DISTINCT ON guards against duplicate dates inside one staging
        // batch; NOT EXISTS skips keys already merged.
        match kind {
            SeriesKind::Economic => format!(
                "INSERT INTO {destination} (series_id, date, value) \
                 SELECT DISTINCT ON (s.series_id, s.date) s.series_id, s.date, s.value \
                 FROM {staging_table} s \
                 WHERE NOT EXISTS (\
                     SELECT 1 FROM {destination} t \
                     WHERE t.series_id = s.series_id AND t.date = s.date\
                 )"
            ),
            SeriesKind::Financial => format!(
                "INSERT INTO {destination} (series_id, date, open, high, low, close, volume) \
                 SELECT DISTINCT ON (s.series_id, s.date) s.series_id, s.date, \
                        s.open, s.high, s.low, s.close, s.volume \
                 FROM {staging_table} s \
                 WHERE NOT EXISTS (\
                     SELECT 1 FROM {destination} t \
                     WHERE t.series_id = s.series_id AND t.date = s.date\
                 )"
            ),
        }
    }
}

#[async_trait]
impl MergeEngine for InsertOnlyMerger {
    async fn merge(&self, handle: &StagingHandle) -> Result<u64> {
        let sql = Self::merge_sql(&handle.location, handle.kind);
        let result = sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(classify)?;

        let inserted = result.rows_affected();
        info!(
            series_id = handle.series_id.as_str(),
            staged = handle.rows,
            inserted,
            destination = destination_table(handle.kind),
            "merge completed"
        );
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_economic_merge_sql_shape() {
        let sql = InsertOnlyMerger::merge_sql("staging_gdpc1_abcd1234", SeriesKind::Economic);
        assert!(sql.contains("INSERT INTO economic_observations"));
        assert!(sql.contains("FROM staging_gdpc1_abcd1234 s"));
        assert!(sql.contains("WHERE NOT EXISTS"));
        assert!(sql.contains("t.series_id = s.series_id AND t.date = s.date"));
        // Insert-only: existing keys are never updated.
        assert!(!sql.to_uppercase().contains("UPDATE"));
    }

    #[test]
    fn test_financial_merge_sql_shape() {
        let sql = InsertOnlyMerger::merge_sql("staging_spy_abcd1234", SeriesKind::Financial);
        assert!(sql.contains("INSERT INTO financial_observations"));
        assert!(sql.contains("s.open, s.high, s.low, s.close, s.volume"));
        assert!(sql.contains("DISTINCT ON (s.series_id, s.date)"));
    }
}
