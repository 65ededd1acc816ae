//! Ingestion orchestration: adapter registry, per-series workflow, and the
//! sequential batch driver.

pub mod driver;
pub mod registry;
pub mod workflow;

#[cfg(test)]
pub(crate) mod test_support;

pub use driver::{run_batch, RunSummary};
pub use registry::AdapterRegistry;
pub use workflow::{
    ingest_series, IngestContext, IngestStage, SeriesOutcome, SeriesSpec, SeriesStatus,
};
