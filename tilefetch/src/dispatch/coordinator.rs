//! Permit-bounded job coordinator.
//!
//! Tiles are spawned into a [`JoinSet`] only when a worker permit is free, so
//! at most `workers` tiles are in flight and the set never fills with tasks
//! that are merely waiting. After each completion the coordinator waits the
//! configured rate-limit delay before topping the pool back up.
//!
//! Cancellation reaches the tiles in flight through their fetcher, so they
//! stop retrying and report `Skipped("cancelled")`.

use std::collections::{HashMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinError, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::DispatchError;
use super::report::{JobSummary, ProgressReporter, TileReport, TracingReporter};
use crate::compose::ScaleCompositor;
use crate::config::DownloadConfig;
use crate::coord::TileCoord;
use crate::enumerate::Job;
use crate::fetch::{FailureKind, FetchOutcome, FetchRequest, Fetcher, RetryPolicy, Scale};
use crate::output::{BackendLock, OutputBackend, OutputLocation, TilesetMetadata};
use crate::provider::{AsyncHttpClient, UrlTemplate};

/// Runs download jobs against one backend.
pub struct Coordinator<C> {
    client: Arc<C>,
    backend: Arc<dyn OutputBackend>,
    reporter: Arc<dyn ProgressReporter>,
    lock: Arc<BackendLock>,
    config: DownloadConfig,
}

impl<C> Coordinator<C>
where
    C: AsyncHttpClient + 'static,
{
    /// Creates a coordinator reporting through `tracing`.
    pub fn new(client: Arc<C>, backend: Arc<dyn OutputBackend>, config: DownloadConfig) -> Self {
        let reporter = Arc::new(TracingReporter::new(config.verbose()));
        Self {
            client,
            backend,
            reporter,
            lock: Arc::new(BackendLock::new()),
            config,
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Downloads every tile of `job` into `location`.
    ///
    /// Metadata is written once before the first tile and the backend is
    /// closed once after the last worker finishes, also after cancellation.
    /// Per-tile failures end up in the summary; only configuration, temp
    /// directory, metadata and close failures abort the job.
    pub async fn run(
        &self,
        job: &Job,
        template: &UrlTemplate,
        location: &OutputLocation,
        cancel: &CancellationToken,
    ) -> Result<JobSummary, DispatchError> {
        self.config.validate()?;
        let started = Instant::now();

        let temp_dir = self.config.temp_dir().to_path_buf();
        tokio::fs::create_dir_all(&temp_dir)
            .await
            .map_err(|source| DispatchError::TempDir {
                path: temp_dir.clone(),
                source,
            })?;

        let metadata = TilesetMetadata::for_job(
            location,
            job.bounds(),
            job.min_zoom(),
            job.max_zoom(),
            self.config.scale(),
        );
        {
            let guard = self.lock.lock().await;
            self.backend
                .add_metadata(&guard, &metadata)
                .map_err(DispatchError::Metadata)?;
        }

        info!(
            tiles = job.len(),
            min_zoom = job.min_zoom(),
            max_zoom = job.max_zoom(),
            workers = self.config.workers(),
            scale = %self.config.scale(),
            backend = self.backend.name(),
            "Starting download job"
        );
        self.reporter.job_started(job.len());

        let worker = Arc::new(TileWorker::new(
            Arc::clone(&self.client),
            Arc::clone(&self.backend),
            Arc::clone(&self.lock),
            location.clone(),
            template.clone(),
            self.config.scale(),
            self.config.retry_policy(),
            temp_dir,
            cancel.clone(),
        ));

        let mut summary = JobSummary::new(job.len());
        let mut pending: VecDeque<TileCoord> = job.iter().copied().collect();
        let permits = Arc::new(Semaphore::new(self.config.workers()));
        let mut in_flight: JoinSet<TileReport> = JoinSet::new();
        let mut spawned: HashMap<Id, TileCoord> = HashMap::new();
        let rate_limit = self.config.rate_limit_delay();

        loop {
            if !cancel.is_cancelled() {
                while !pending.is_empty() {
                    let Ok(permit) = Arc::clone(&permits).try_acquire_owned() else {
                        break;
                    };
                    let Some(tile) = pending.pop_front() else {
                        break;
                    };
                    let worker = Arc::clone(&worker);
                    let handle = in_flight.spawn(async move {
                        let _permit = permit;
                        worker.run(tile).await
                    });
                    spawned.insert(handle.id(), tile);
                }
            }

            let Some(joined) = in_flight.join_next_with_id().await else {
                break;
            };
            let Some(report) = settle(joined, &mut spawned) else {
                continue;
            };
            summary.record(&report.outcome);
            self.reporter.tile_finished(&report);

            let more_to_come =
                !in_flight.is_empty() || (!pending.is_empty() && !cancel.is_cancelled());
            if more_to_come && !rate_limit.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(rate_limit) => {}
                }
            }
        }

        if !pending.is_empty() {
            debug!(skipped = pending.len(), "Job cancelled before all tiles were submitted");
        }
        for tile in pending.drain(..) {
            let report = TileReport::new(tile, FetchOutcome::cancelled(), Duration::ZERO);
            summary.record(&report.outcome);
            self.reporter.tile_finished(&report);
        }

        {
            let guard = self.lock.lock().await;
            self.backend
                .close(
                    &guard,
                    location.output_path(),
                    &location.full_path(),
                    job.min_zoom(),
                    job.max_zoom(),
                )
                .map_err(DispatchError::Close)?;
        }

        summary.elapsed = started.elapsed();
        self.reporter.job_finished(&summary);
        Ok(summary)
    }
}

/// Report for a joined tile task.
///
/// A task that ended without a report (aborted, or a panic that escaped
/// the worker) is attributed to its tile through the spawn id and reported
/// as an internal failure.
pub(super) fn settle(
    joined: Result<(Id, TileReport), JoinError>,
    spawned: &mut HashMap<Id, TileCoord>,
) -> Option<TileReport> {
    match joined {
        Ok((id, report)) => {
            spawned.remove(&id);
            Some(report)
        }
        Err(e) => {
            warn!(error = %e, "Tile worker did not complete");
            let tile = spawned.remove(&e.id())?;
            Some(TileReport::new(
                tile,
                FetchOutcome::failed(FailureKind::Internal, e.to_string()),
                Duration::ZERO,
            ))
        }
    }
}

/// Everything a spawned tile task needs, shared between tasks.
struct TileWorker<C> {
    fetcher: Fetcher<C>,
    compositor: ScaleCompositor<C>,
    backend: Arc<dyn OutputBackend>,
    lock: Arc<BackendLock>,
    location: OutputLocation,
    template: UrlTemplate,
    scale: Scale,
    policy: RetryPolicy,
    temp_dir: PathBuf,
}

impl<C: AsyncHttpClient> TileWorker<C> {
    #[allow(clippy::too_many_arguments)]
    fn new(
        client: Arc<C>,
        backend: Arc<dyn OutputBackend>,
        lock: Arc<BackendLock>,
        location: OutputLocation,
        template: UrlTemplate,
        scale: Scale,
        policy: RetryPolicy,
        temp_dir: PathBuf,
        cancel: CancellationToken,
    ) -> Self {
        let fetcher = Fetcher::new(client).with_cancellation(cancel);
        Self {
            compositor: ScaleCompositor::new(fetcher.clone()),
            fetcher,
            backend,
            lock,
            location,
            template,
            scale,
            policy,
            temp_dir,
        }
    }

    /// Processes one tile. A panic inside becomes an `Internal` failure so
    /// the tile still gets its report.
    async fn run(&self, tile: TileCoord) -> TileReport {
        let started = Instant::now();
        let outcome = match AssertUnwindSafe(self.process(tile)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(_) => FetchOutcome::failed(FailureKind::Internal, "tile worker panicked"),
        };
        TileReport::new(tile, outcome, started.elapsed())
    }

    async fn process(&self, tile: TileCoord) -> FetchOutcome {
        let target = self.location.target_for(&tile);
        if self.backend.exists(&target, &tile) {
            return FetchOutcome::AlreadyExists;
        }

        // Removed on drop, whatever happens below.
        let temp = match tempfile::Builder::new()
            .prefix("tile-")
            .suffix(".png")
            .tempfile_in(&self.temp_dir)
        {
            Ok(temp) => temp,
            Err(e) => {
                return FetchOutcome::failed(
                    FailureKind::Internal,
                    format!("cannot create temp file in {}: {}", self.temp_dir.display(), e),
                )
            }
        };

        let request = FetchRequest::new(tile, self.template.clone(), self.scale, self.policy);
        let outcome = match self.scale {
            Scale::One => self.fetcher.fetch_to_file(&request, temp.path()).await,
            Scale::Two => self.compositor.render_to_file(&request, temp.path()).await,
        };
        if !outcome.is_success() {
            return outcome;
        }

        let guard = self.lock.lock().await;
        match self
            .backend
            .add_tile(&guard, &target, temp.path(), &tile, self.scale)
        {
            Ok(()) => outcome,
            Err(e) => FetchOutcome::failed(FailureKind::Storage, e.to_string()),
        }
    }
}
