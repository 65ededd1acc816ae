//! Single-series ingest command, for onboarding a new series or re-running
//! one that failed in a batch.

use anyhow::{bail, Result};
use clap::Args;

use econ_ingest_core::SeriesKind;
use econ_ingest_pipeline::{run_batch, SeriesSpec};

/// Arguments for the backfill command.
#[derive(Args, Debug, Clone)]
pub struct BackfillArgs {
    /// Series id as known to the source (e.g. "GDP", "SPY")
    #[arg(long)]
    pub series_id: String,

    /// Source origin: "fred", "polygon", or "csv"
    #[arg(long)]
    pub origin: String,

    /// Series kind: "economic" or "financial"
    #[arg(long)]
    pub kind: String,

    /// Config file path
    #[arg(short, long, default_value = "config/Config.toml")]
    pub config: String,
}

/// Runs the backfill command.
///
/// # Errors
/// Returns an error if the config cannot be read, the warehouse is
/// unreachable, or the series fails to ingest.
pub async fn run_backfill(args: BackfillArgs) -> Result<()> {
    let kind: SeriesKind = args.kind.parse()?;
    let config = super::load_config(&args.config)?;
    let registry = super::build_registry(&config)?;
    let (_client, ctx) = super::build_context(&config).await?;
    let abort = super::abort_on_ctrl_c();

    let specs = vec![SeriesSpec {
        series_id: args.series_id.clone(),
        origin: args.origin,
        kind,
    }];
    let summary = run_batch(&specs, &registry, &ctx, &abort).await;
    if !summary.is_success() {
        bail!("ingestion failed for {}", args.series_id);
    }
    Ok(())
}
