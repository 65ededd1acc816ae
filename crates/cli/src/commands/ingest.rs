//! Batch ingest command.
//!
//! Reads a JSON batch file listing the series to ingest and runs them
//! sequentially. The process exits non-zero when any series fails.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use econ_ingest_pipeline::{run_batch, SeriesSpec};

/// Arguments for the ingest command.
#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    /// Path to a JSON file with the series to ingest:
    /// [{"series_id": "GDP", "origin": "fred", "kind": "economic"}, ...]
    #[arg(short, long)]
    pub series: PathBuf,

    /// Config file path
    #[arg(short, long, default_value = "config/Config.toml")]
    pub config: String,
}

/// Runs the ingest command.
///
/// # Errors
/// Returns an error if the batch file or config cannot be read, the
/// warehouse is unreachable, or any series in the batch fails.
pub async fn run_ingest(args: IngestArgs) -> Result<()> {
    let config = super::load_config(&args.config)?;
    let specs = read_specs(&args.series)?;
    if specs.is_empty() {
        bail!("batch file {} lists no series", args.series.display());
    }

    let registry = super::build_registry(&config)?;
    let (_client, ctx) = super::build_context(&config).await?;
    let abort = super::abort_on_ctrl_c();

    let summary = run_batch(&specs, &registry, &ctx, &abort).await;
    if !summary.is_success() {
        bail!(
            "{} of {} series failed",
            summary.failed(),
            summary.outcomes.len()
        );
    }
    Ok(())
}

fn read_specs(path: &PathBuf) -> Result<Vec<SeriesSpec>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read batch file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("invalid batch file {}", path.display()))
}
