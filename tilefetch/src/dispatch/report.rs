//! Per-tile reports and job summaries.

use std::fmt;
use std::time::Duration;

use tracing::{info, trace, warn};

use crate::coord::TileCoord;
use crate::fetch::FetchOutcome;

/// Outcome of one tile, delivered once to the [`ProgressReporter`].
#[derive(Debug, Clone)]
pub struct TileReport {
    pub tile: TileCoord,
    pub outcome: FetchOutcome,
    /// Time from submission to outcome
    pub elapsed: Duration,
}

impl TileReport {
    pub fn new(tile: TileCoord, outcome: FetchOutcome, elapsed: Duration) -> Self {
        Self {
            tile,
            outcome,
            elapsed,
        }
    }
}

/// Tile counts for a finished job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobSummary {
    pub total: usize,
    pub succeeded: usize,
    pub already_existing: usize,
    pub skipped: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl JobSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Counts one outcome.
    pub fn record(&mut self, outcome: &FetchOutcome) {
        match outcome {
            FetchOutcome::Success { .. } => self.succeeded += 1,
            FetchOutcome::AlreadyExists => self.already_existing += 1,
            FetchOutcome::Skipped(_) => self.skipped += 1,
            FetchOutcome::Failed { .. } => self.failed += 1,
        }
    }

    /// Tiles with an outcome so far.
    pub fn processed(&self) -> usize {
        self.succeeded + self.already_existing + self.skipped + self.failed
    }

    /// Every tile was stored, now or earlier.
    pub fn is_complete(&self) -> bool {
        self.succeeded + self.already_existing == self.total
    }
}

impl fmt::Display for JobSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tiles: {} downloaded, {} already present, {} skipped, {} failed in {:.1}s",
            self.total,
            self.succeeded,
            self.already_existing,
            self.skipped,
            self.failed,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Receives job progress from the coordinator.
///
/// Implementations are called from the coordinator task only, never
/// concurrently, but must be shareable with it.
pub trait ProgressReporter: Send + Sync {
    fn job_started(&self, _total: usize) {}

    fn tile_finished(&self, report: &TileReport);

    fn job_finished(&self, _summary: &JobSummary) {}
}

/// Reports through `tracing`. Failures are always logged; successes only
/// when verbose.
#[derive(Debug, Clone, Default)]
pub struct TracingReporter {
    verbose: bool,
}

impl TracingReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for TracingReporter {
    fn job_started(&self, total: usize) {
        info!(tiles = total, "Download started");
    }

    fn tile_finished(&self, report: &TileReport) {
        match &report.outcome {
            FetchOutcome::Failed { kind, message } => warn!(
                tile = %report.tile,
                kind = %kind,
                error = %message,
                "Tile failed"
            ),
            FetchOutcome::Skipped(reason) => trace!(tile = %report.tile, reason = %reason, "Tile skipped"),
            outcome if self.verbose => info!(
                tile = %report.tile,
                outcome = %outcome,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Tile done"
            ),
            outcome => trace!(tile = %report.tile, outcome = %outcome, "Tile done"),
        }
    }

    fn job_finished(&self, summary: &JobSummary) {
        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            already_existing = summary.already_existing,
            skipped = summary.skipped,
            failed = summary.failed,
            elapsed_secs = summary.elapsed.as_secs_f64(),
            "Download finished"
        );
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn tile_finished(&self, _report: &TileReport) {}
}
