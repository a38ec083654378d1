//! Download command - fetch every tile of a region.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use tilefetch::config::{ConfigError, ConfigFile, DownloadConfig};
use tilefetch::dispatch::Coordinator;
use tilefetch::enumerate::enumerate_tiles;
use tilefetch::fetch::Scale;
use tilefetch::output::{create_backend, OutputLocation, OutputType};
use tilefetch::provider::{AsyncReqwestClient, UrlTemplate};
use tilefetch::region::{load_geojson_file, BoundingBox, RegionFilter};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{CliError, EXIT_INTERRUPTED};
use crate::progress::ProgressBarReporter;
use crate::runner::CliRunner;

/// Arguments for the download command.
#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Tile URL template with {x}, {y}, {z}, {quad} or {scale:22} placeholders
    #[arg(long)]
    pub url: String,

    /// Output directory, created under the output root
    #[arg(long)]
    pub output_dir: String,

    /// Minimum zoom level
    #[arg(long)]
    pub min_zoom: u8,

    /// Maximum zoom level
    #[arg(long)]
    pub max_zoom: u8,

    /// Bounding box as min_lon,min_lat,max_lon,max_lat
    #[arg(
        long,
        allow_hyphen_values = true,
        conflicts_with = "geojson",
        required_unless_present = "geojson"
    )]
    pub bounds: Option<BoundingBox>,

    /// GeoJSON file containing a polygon area to download
    #[arg(long)]
    pub geojson: Option<PathBuf>,

    /// Number of tiles downloaded in parallel [default: 4]
    #[arg(long)]
    pub threads: Option<usize>,

    /// Output type: directory, mbtiles or repo [default: directory]
    #[arg(long)]
    pub output_type: Option<OutputType>,

    /// File pattern (directory) or file name (mbtiles, repo) [default: {z}/{x}/{y}.png]
    #[arg(long)]
    pub output_file: Option<String>,

    /// Output scale, 1 or 2 [default: 1]
    #[arg(long, value_parser = parse_scale)]
    pub output_scale: Option<Scale>,

    /// Print every tile, not only failures
    #[arg(short, long)]
    pub verbose: bool,

    /// Also write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Attempts per tile, first try included [default: 5]
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Per-attempt timeout in seconds [default: 60]
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Delay before the first retry in seconds, doubling afterwards [default: 2]
    #[arg(long)]
    pub retry_delay: Option<u64>,

    /// Delay between tile completions in seconds, e.g. 0.1-0.5 for rate limited servers [default: 0]
    #[arg(long, value_parser = parse_seconds)]
    pub rate_limit_delay: Option<Duration>,

    /// Only count the tiles, download nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Configuration file [default: ~/.tilefetch/config.ini]
    #[arg(long)]
    pub config: Option<PathBuf>,
}

fn parse_scale(s: &str) -> Result<Scale, String> {
    let value: u8 = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    Scale::try_from(value).map_err(|e| e.to_string())
}

fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("'{}': {}", s, e))
}

/// Merges command-line flags over the configuration file.
pub fn resolve_config(args: &DownloadArgs, file: &ConfigFile) -> Result<DownloadConfig, CliError> {
    let mut config = file.download_config();

    if let Some(threads) = args.threads {
        config = config.with_workers(threads);
    }
    if let Some(attempts) = args.max_retries {
        config = config.with_max_attempts(attempts);
    }
    if let Some(secs) = args.timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = args.retry_delay {
        config = config.with_retry_delay(Duration::from_secs(secs));
    }
    if let Some(delay) = args.rate_limit_delay {
        config = config.with_rate_limit_delay(delay);
    }
    if let Some(output_type) = args.output_type {
        config = config.with_output_type(output_type);
    }
    if let Some(file_pattern) = &args.output_file {
        config = config.with_output_file(file_pattern.clone());
    }
    if let Some(scale) = args.output_scale {
        config = config.with_scale(scale);
    }
    if args.verbose {
        config = config.with_verbose(true);
    }

    config.validate()?;
    Ok(config)
}

/// Bounding box and filter from `--bounds` or `--geojson`.
pub fn resolve_region(args: &DownloadArgs) -> Result<(BoundingBox, RegionFilter), CliError> {
    match (&args.bounds, &args.geojson) {
        (Some(bounds), _) => Ok((*bounds, RegionFilter::None)),
        (None, Some(path)) => {
            let region = load_geojson_file(path)?;
            Ok((region.bounds, region.filter))
        }
        (None, None) => Err(CliError::InvalidInput(ConfigError::InvalidBounds(
            "either --bounds or --geojson is required".to_string(),
        ))),
    }
}

/// First Ctrl-C cancels the job, a second one exits at once.
async fn watch_interrupts(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    eprintln!("\nCancelling: stopping tiles in flight (Ctrl-C again to quit now)...");
    cancel.cancel();

    if tokio::signal::ctrl_c().await.is_ok() {
        eprintln!("Interrupted");
        process::exit(EXIT_INTERRUPTED);
    }
}

/// Run the download command.
pub async fn run(args: DownloadArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.config.as_deref(), args.verbose, args.log_file.as_deref())?;
    runner.log_startup("download");

    let config = resolve_config(&args, runner.config())?;
    let (bounds, filter) = resolve_region(&args)?;

    println!(
        "Calculating tiles for zoom levels {} to {}...",
        args.min_zoom, args.max_zoom
    );
    let job = enumerate_tiles(&bounds, args.min_zoom, args.max_zoom, &filter)?;
    println!("Found {} tiles to download", job.len());

    if args.dry_run {
        for (zoom, count) in job.count_per_zoom() {
            println!("  zoom {:>2}: {} tiles", zoom, count);
        }
        return Ok(());
    }

    let template = UrlTemplate::new(args.url.as_str());
    if !template.has_placeholders() {
        warn!(url = %template, "URL template has no tile placeholders; every tile will be identical");
    }

    let location = OutputLocation::new(
        config.output_root(),
        &args.output_dir,
        config.output_file(),
        config.output_type(),
    );
    let backend = create_backend(config.output_type(), &location)?;
    let client = Arc::new(AsyncReqwestClient::with_pool_size(config.workers())?);
    let reporter = Arc::new(ProgressBarReporter::new(job.len(), config.verbose()));

    let cancel = CancellationToken::new();
    tokio::spawn(watch_interrupts(cancel.clone()));

    info!(
        url = %template,
        output = %location.full_path().display(),
        output_type = %config.output_type(),
        "Download configured"
    );
    println!("Starting download with {} threads...", config.workers());

    let coordinator = Coordinator::new(client, backend, config).with_reporter(reporter);
    let summary = coordinator.run(&job, &template, &location, &cancel).await?;

    if cancel.is_cancelled() {
        return Err(CliError::Cancelled(summary));
    }

    println!(
        "Download complete! {} tiles processed in {:.2} seconds",
        summary.total,
        summary.elapsed.as_secs_f64()
    );
    println!("  {}", summary);
    Ok(())
}
