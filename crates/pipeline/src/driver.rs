//! Sequential batch driver.
//!
//! Runs each requested series to completion before starting the next, so a
//! failure in one series never blocks or corrupts another. An abort flag is
//! checked between series; series already in flight finish normally.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::registry::AdapterRegistry;
use crate::workflow::{self, IngestContext, IngestStage, SeriesOutcome, SeriesSpec, SeriesStatus};

/// Aggregated result of one batch run.
#[derive(Debug)]
pub struct RunSummary {
    pub outcomes: Vec<SeriesOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, SeriesStatus::Completed { .. }))
            .count()
    }

    #[must_use]
    pub fn up_to_date(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == SeriesStatus::UpToDate)
            .count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    #[must_use]
    pub fn total_inserted(&self) -> u64 {
        self.outcomes
            .iter()
            .map(|o| match o.status {
                SeriesStatus::Completed { rows_inserted } => rows_inserted,
                _ => 0,
            })
            .sum()
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Logs the end-of-run report, one line per failure.
    pub fn log_report(&self) {
        info!(
            total = self.outcomes.len(),
            succeeded = self.succeeded(),
            up_to_date = self.up_to_date(),
            failed = self.failed(),
            rows_inserted = self.total_inserted(),
            elapsed_secs = (self.finished_at - self.started_at).num_seconds(),
            "ingestion run finished"
        );
        for outcome in &self.outcomes {
            if let SeriesStatus::Failed { stage, error } = &outcome.status {
                error!(series_id = %outcome.series_id, %stage, %error, "series failed");
            }
        }
    }
}

/// Runs every spec in order against the registry.
///
/// Unknown origins and duplicate series ids become failed outcomes rather
/// than aborting the batch. Setting `abort` stops the run before the next
/// series starts.
pub async fn run_batch(
    specs: &[SeriesSpec],
    registry: &AdapterRegistry,
    ctx: &IngestContext,
    abort: &AtomicBool,
) -> RunSummary {
    let started_at = Utc::now();
    info!(series = specs.len(), "starting ingestion run");

    let mut outcomes = Vec::with_capacity(specs.len());
    let mut seen: HashSet<&str> = HashSet::new();
    for spec in specs {
        if abort.load(Ordering::SeqCst) {
            warn!(
                remaining = specs.len() - outcomes.len(),
                "abort requested, skipping remaining series"
            );
            break;
        }
        if !seen.insert(&spec.series_id) {
            warn!(series_id = %spec.series_id, "duplicate series in batch, skipping");
            outcomes.push(SeriesOutcome {
                series_id: spec.series_id.clone(),
                status: SeriesStatus::Failed {
                    stage: IngestStage::ResolveWatermark,
                    error: "duplicate series id in batch".to_string(),
                },
                elapsed: std::time::Duration::ZERO,
            });
            continue;
        }
        let Some(adapter) = registry.get(&spec.origin) else {
            warn!(series_id = %spec.series_id, origin = %spec.origin, "no adapter for origin");
            outcomes.push(SeriesOutcome {
                series_id: spec.series_id.clone(),
                status: SeriesStatus::Failed {
                    stage: IngestStage::ResolveWatermark,
                    error: format!("no adapter registered for origin '{}'", spec.origin),
                },
                elapsed: std::time::Duration::ZERO,
            });
            continue;
        };
        let today = Utc::now().date_naive();
        let outcome = workflow::ingest_series(adapter.as_ref(), ctx, spec, today).await;
        outcomes.push(outcome);
    }

    let summary = RunSummary {
        outcomes,
        started_at,
        finished_at: Utc::now(),
    };
    summary.log_report();
    summary
}
