use clap::{Parser, Subcommand};

mod commands;

use commands::{BackfillArgs, IngestArgs, StatusArgs};

#[derive(Parser)]
#[command(name = "econ-ingest")]
#[command(about = "Incremental ingestion of economic and financial time series", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest every series listed in a batch file
    Ingest(IngestArgs),
    /// Ingest a single series by id
    Backfill(BackfillArgs),
    /// Show catalog entries, watermarks, and row counts
    Status(StatusArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Ingest(args) => {
            commands::run_ingest(args).await?;
        }
        Commands::Backfill(args) => {
            commands::run_backfill(args).await?;
        }
        Commands::Status(args) => {
            commands::run_status(args).await?;
        }
    }

    Ok(())
}
