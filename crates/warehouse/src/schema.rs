//! Table names, DDL, and identifier helpers shared by the warehouse modules.

use econ_ingest_core::SeriesKind;

pub const CATALOG_TABLE: &str = "series_catalog";
pub const ECONOMIC_TABLE: &str = "economic_observations";
pub const FINANCIAL_TABLE: &str = "financial_observations";

pub const CREATE_CATALOG: &str = r"
    CREATE TABLE IF NOT EXISTS series_catalog (
        series_id TEXT PRIMARY KEY,
        display_name TEXT NOT NULL,
        kind TEXT NOT NULL,
        origin TEXT NOT NULL,
        observation_start DATE,
        observation_end DATE,
        frequency TEXT NOT NULL,
        units TEXT NOT NULL,
        seasonal_adjustment TEXT NOT NULL,
        metadata JSONB NOT NULL DEFAULT '{}',
        last_merged_date DATE,
        last_refreshed_at TIMESTAMPTZ
    )
";

pub const CREATE_ECONOMIC: &str = r"
    CREATE TABLE IF NOT EXISTS economic_observations (
        series_id TEXT NOT NULL,
        date DATE NOT NULL,
        value DOUBLE PRECISION,
        PRIMARY KEY (series_id, date)
    )
";

pub const CREATE_FINANCIAL: &str = r"
    CREATE TABLE IF NOT EXISTS financial_observations (
        series_id TEXT NOT NULL,
        date DATE NOT NULL,
        open DOUBLE PRECISION,
        high DOUBLE PRECISION,
        low DOUBLE PRECISION,
        close DOUBLE PRECISION,
        volume BIGINT,
        PRIMARY KEY (series_id, date)
    )
";

/// Permanent table for a series kind.
#[must_use]
pub fn destination_table(kind: SeriesKind) -> &'static str {
    match kind {
        SeriesKind::Economic => ECONOMIC_TABLE,
        SeriesKind::Financial => FINANCIAL_TABLE,
    }
}

/// Reduces a series id to a safe SQL identifier fragment. Series ids can
/// carry dots and other punctuation (e.g. "BAMLH0A0.HYM2").
#[must_use]
pub fn sanitize_identifier(series_id: &str) -> String {
    series_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_table() {
        assert_eq!(destination_table(SeriesKind::Economic), "economic_observations");
        assert_eq!(destination_table(SeriesKind::Financial), "financial_observations");
    }

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("GDPC1"), "gdpc1");
        assert_eq!(sanitize_identifier("BAMLH0A0.HYM2"), "bamlh0a0_hym2");
        assert_eq!(sanitize_identifier("sp-500 index"), "sp_500_index");
    }
}
