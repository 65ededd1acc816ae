//! Catalog status command.
//!
//! Prints each cataloged series with its watermark and warehouse row count,
//! to check data availability before pointing models at the tables.

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;

use econ_ingest_warehouse::{ObservationReader, SeriesCatalog, WarehouseClient};

/// Arguments for the status command.
#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    /// Show only this series. If not provided, shows the whole catalog.
    #[arg(long)]
    pub series_id: Option<String>,

    /// Config file path
    #[arg(short, long, default_value = "config/Config.toml")]
    pub config: String,
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map_or_else(|| "-".to_string(), |d| d.to_string())
}

/// Runs the status command.
///
/// # Errors
/// Returns an error if the config cannot be read or the warehouse queries
/// fail.
pub async fn run_status(args: StatusArgs) -> Result<()> {
    let config = super::load_config(&args.config)?;
    let client = WarehouseClient::connect(&config.database).await?;
    client.ensure_schema().await?;
    let catalog = SeriesCatalog::new(client.pool().clone());
    let reader = ObservationReader::new(client.pool().clone());

    let mut descriptors = catalog.list_descriptors().await?;
    if let Some(filter) = &args.series_id {
        descriptors.retain(|d| &d.series_id == filter);
    }
    if descriptors.is_empty() {
        println!("no series found");
        return Ok(());
    }

    println!(
        "{:<16} {:<10} {:<8} {:<12} {:<12} {:>10}",
        "SERIES", "KIND", "ORIGIN", "WATERMARK", "REFRESHED", "ROWS"
    );
    for descriptor in descriptors {
        let rows = reader
            .count_observations(&descriptor.series_id, descriptor.kind)
            .await?;
        let refreshed = descriptor
            .last_refreshed_at
            .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d").to_string());
        println!(
            "{:<16} {:<10} {:<8} {:<12} {:<12} {:>10}",
            descriptor.series_id,
            descriptor.kind.as_str(),
            descriptor.origin,
            format_date(descriptor.last_merged_date),
            refreshed,
            rows
        );
    }
    Ok(())
}
