//! CLI command implementations.

mod backfill;
mod ingest;
mod status;

pub use backfill::{run_backfill, BackfillArgs};
pub use ingest::{run_ingest, IngestArgs};
pub use status::{run_status, StatusArgs};

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::warn;

use econ_ingest_core::{AppConfig, ConfigLoader, RetryingHttpClient};
use econ_ingest_pipeline::{AdapterRegistry, IngestContext};
use econ_ingest_csv::CsvAdapter;
use econ_ingest_fred::FredAdapter;
use econ_ingest_polygon::PolygonAdapter;
use econ_ingest_warehouse::{InsertOnlyMerger, SeriesCatalog, StagingArea, WarehouseClient};

pub(crate) fn load_config(path: &str) -> Result<AppConfig> {
    ConfigLoader::load_from(path).with_context(|| format!("failed to load config from {path}"))
}

/// Builds the registry from the configured source sections. Each adapter is
/// registered only when its section is present.
pub(crate) fn build_registry(config: &AppConfig) -> Result<AdapterRegistry> {
    let mut registry = AdapterRegistry::new();
    let http_config = config.ingest.http_client();

    if let Some(fred) = &config.fred {
        let http = RetryingHttpClient::new(http_config.clone())?;
        registry.register(Arc::new(FredAdapter::new(fred.clone(), http)));
    }
    if let Some(polygon) = &config.polygon {
        let http = RetryingHttpClient::new(http_config.clone())?;
        registry.register(Arc::new(PolygonAdapter::new(polygon.clone(), http)));
    }
    if let Some(csv) = &config.csv {
        registry.register(Arc::new(CsvAdapter::new(csv.clone())));
    }

    if registry.is_empty() {
        bail!("no sources configured; add a [fred], [polygon], or [csv] section");
    }
    Ok(registry)
}

/// Connects to the warehouse, ensures the schema, and wires the staging,
/// merge, and catalog collaborators.
pub(crate) async fn build_context(config: &AppConfig) -> Result<(WarehouseClient, IngestContext)> {
    let client = WarehouseClient::connect(&config.database).await?;
    client.ensure_schema().await?;
    let pool = client.pool().clone();
    let ctx = IngestContext {
        store: Arc::new(SeriesCatalog::new(pool.clone())),
        staging: Arc::new(StagingArea::new(pool.clone())),
        merger: Arc::new(InsertOnlyMerger::new(pool)),
        config: config.ingest.clone(),
    };
    Ok((client, ctx))
}

/// Abort flag flipped by Ctrl-C. The series in flight finishes; the rest of
/// the batch is skipped.
pub(crate) fn abort_on_ctrl_c() -> Arc<AtomicBool> {
    let abort = Arc::new(AtomicBool::new(false));
    let flag = abort.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing current series");
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
        }
    });
    abort
}
