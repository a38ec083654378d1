//! Terminal progress bar for download jobs.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tilefetch::dispatch::{JobSummary, ProgressReporter, TileReport};
use tilefetch::fetch::FetchOutcome;

const TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} tiles ({per_sec}, {eta})";

/// Reporter drawing an indicatif bar on stderr.
///
/// Failed tiles are always printed above the bar; other outcomes only in
/// verbose mode.
pub struct ProgressBarReporter {
    bar: ProgressBar,
    verbose: bool,
}

impl ProgressBarReporter {
    pub fn new(total: usize, verbose: bool) -> Self {
        Self::with_target(total, verbose, ProgressDrawTarget::stderr())
    }

    fn with_target(total: usize, verbose: bool, target: ProgressDrawTarget) -> Self {
        let bar = ProgressBar::with_draw_target(Some(total as u64), target);
        let style = ProgressStyle::default_bar()
            .template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        Self { bar, verbose }
    }

    fn line(&self, report: &TileReport) -> Option<String> {
        let tile = report.tile;
        match &report.outcome {
            FetchOutcome::Failed { kind, message } => Some(format!(
                "Failed to download tile {},{},{}: {} ({})",
                tile.x, tile.y, tile.z, kind, message
            )),
            _ if !self.verbose => None,
            FetchOutcome::Success { .. } => Some(format!(
                "Downloaded tile {},{},{} in {:.2}s",
                tile.x,
                tile.y,
                tile.z,
                report.elapsed.as_secs_f64()
            )),
            FetchOutcome::AlreadyExists => Some(format!(
                "Tile {},{},{} already exists, skipping",
                tile.x, tile.y, tile.z
            )),
            FetchOutcome::Skipped(reason) => Some(format!(
                "Skipped tile {},{},{}: {}",
                tile.x, tile.y, tile.z, reason
            )),
        }
    }
}

impl ProgressReporter for ProgressBarReporter {
    fn job_started(&self, total: usize) {
        self.bar.set_length(total as u64);
    }

    fn tile_finished(&self, report: &TileReport) {
        if let Some(line) = self.line(report) {
            self.bar.println(line);
        }
        self.bar.inc(1);
    }

    fn job_finished(&self, _summary: &JobSummary) {
        self.bar.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tilefetch::coord::TileCoord;
    use tilefetch::fetch::FailureKind;

    fn report(outcome: FetchOutcome) -> TileReport {
        TileReport::new(TileCoord::new(3, 5, 4), outcome, Duration::from_millis(250))
    }

    fn hidden(verbose: bool) -> ProgressBarReporter {
        ProgressBarReporter::with_target(10, verbose, ProgressDrawTarget::hidden())
    }

    #[test]
    fn test_failures_always_shown() {
        let reporter = hidden(false);
        let line = reporter
            .line(&report(FetchOutcome::failed(FailureKind::NotFound, "HTTP 404")))
            .unwrap();
        assert!(line.starts_with("Failed to download tile 3,5,4"));
    }

    #[test]
    fn test_successes_only_when_verbose() {
        let ok = report(FetchOutcome::Success { bytes: vec![1] });
        assert!(hidden(false).line(&ok).is_none());
        assert_eq!(
            hidden(true).line(&ok).as_deref(),
            Some("Downloaded tile 3,5,4 in 0.25s")
        );
    }

    #[test]
    fn test_every_report_advances_bar() {
        let reporter = hidden(false);
        reporter.tile_finished(&report(FetchOutcome::AlreadyExists));
        reporter.tile_finished(&report(FetchOutcome::Skipped("cancelled".into())));
        assert_eq!(reporter.bar.position(), 2);
    }
}
