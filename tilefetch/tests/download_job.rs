//! End-to-end download jobs against the real output backends.
//!
//! A scripted tile server stands in for the network; everything else is
//! the production pipeline: enumeration, fetch with retries, compositing,
//! and the directory, MBTiles and repo writers.

use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::{ImageFormat, Rgba, RgbaImage};
use tempfile::TempDir;
use tilefetch::config::DownloadConfig;
use tilefetch::dispatch::{Coordinator, JobSummary, NullReporter};
use tilefetch::enumerate::{enumerate_tiles, Job};
use tilefetch::fetch::Scale;
use tilefetch::output::{
    create_backend, MbtilesBackend, OutputLocation, OutputType, RepoManifest,
};
use tilefetch::provider::{AsyncHttpClient, HttpResponse, ProviderError, UrlTemplate};
use tilefetch::region::{BoundingBox, RegionFilter};
use tokio_util::sync::CancellationToken;

// =============================================================================
// Test Helpers
// =============================================================================

/// Tile server answering every URL with a small PNG, except `missing` ones.
#[derive(Default)]
struct TileServer {
    missing: HashSet<String>,
    requests: AtomicUsize,
}

impl TileServer {
    fn without(urls: &[&str]) -> Self {
        Self {
            missing: urls.iter().map(|u| u.to_string()).collect(),
            ..Self::default()
        }
    }

    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl AsyncHttpClient for TileServer {
    async fn get(&self, url: &str) -> Result<HttpResponse, ProviderError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.missing.contains(url) {
            return Ok(HttpResponse::new(404, "not found"));
        }
        Ok(HttpResponse::ok(png(4)))
    }
}

fn png(size: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(size, size, Rgba([40, 120, 200, 255]));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

fn template() -> UrlTemplate {
    UrlTemplate::new("https://tile.test/{z}/{x}/{y}.png")
}

fn world_job(max_zoom: u8) -> Job {
    let bounds = BoundingBox::new(-180.0, -85.0, 180.0, 85.0).unwrap();
    enumerate_tiles(&bounds, 0, max_zoom, &RegionFilter::None).unwrap()
}

fn config(dir: &TempDir) -> DownloadConfig {
    DownloadConfig::new()
        .with_workers(3)
        .with_max_attempts(2)
        .with_retry_delay(Duration::ZERO)
        .with_output_root(dir.path().join("output"))
        .with_temp_dir(dir.path().join("temp"))
}

/// Runs `job` to completion and returns the summary.
async fn download(
    server: &Arc<TileServer>,
    config: DownloadConfig,
    job: &Job,
    output_dir: &str,
) -> (JobSummary, OutputLocation) {
    let location = OutputLocation::new(
        config.output_root(),
        output_dir,
        config.output_file(),
        config.output_type(),
    );
    let backend = create_backend(config.output_type(), &location).unwrap();
    let coordinator = Coordinator::new(Arc::clone(server), backend, config)
        .with_reporter(Arc::new(NullReporter));

    let summary = coordinator
        .run(job, &template(), &location, &CancellationToken::new())
        .await
        .unwrap();
    (summary, location)
}

fn temp_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

// =============================================================================
// Directory output
// =============================================================================

#[tokio::test]
async fn test_directory_job_writes_every_tile() {
    let dir = TempDir::new().unwrap();
    let server = Arc::new(TileServer::default());
    let job = world_job(2);

    let (summary, _) = download(&server, config(&dir), &job, "world").await;

    assert_eq!(summary.total, 21);
    assert_eq!(summary.succeeded, 21);
    assert!(summary.is_complete());
    for tile in job.iter() {
        let path = dir
            .path()
            .join(format!("output/world/{}/{}/{}.png", tile.z, tile.x, tile.y));
        assert!(path.is_file(), "missing {}", path.display());
    }
    assert!(temp_is_empty(&dir.path().join("temp")));
}

#[tokio::test]
async fn test_second_run_skips_stored_tiles() {
    let dir = TempDir::new().unwrap();
    let job = world_job(1);

    let first = Arc::new(TileServer::default());
    download(&first, config(&dir), &job, "world").await;
    assert_eq!(first.requests(), 5);

    let second = Arc::new(TileServer::default());
    let (summary, _) = download(&second, config(&dir), &job, "world").await;

    assert_eq!(second.requests(), 0);
    assert_eq!(summary.already_existing, 5);
    assert_eq!(summary.succeeded, 0);
}

#[tokio::test]
async fn test_missing_tile_is_reported_not_fatal() {
    let dir = TempDir::new().unwrap();
    let server = Arc::new(TileServer::without(&["https://tile.test/1/0/0.png"]));

    let (summary, _) = download(&server, config(&dir), &world_job(1), "world").await;

    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.failed, 1);
    assert!(!dir.path().join("output/world/1/0/0.png").exists());
    // Two attempts for the missing tile, one for each of the others
    assert_eq!(server.requests(), 6);
}

#[tokio::test]
async fn test_scale_two_stores_composites() {
    let dir = TempDir::new().unwrap();
    let server = Arc::new(TileServer::default());
    let config = config(&dir).with_scale(Scale::Two);

    let (summary, _) = download(&server, config, &world_job(0), "retina").await;

    assert_eq!(summary.succeeded, 1);
    // One request per child quadrant
    assert_eq!(server.requests(), 4);
    let stored = image::open(dir.path().join("output/retina/0/0/0.png")).unwrap();
    assert_eq!((stored.width(), stored.height()), (8, 8));
}

// =============================================================================
// MBTiles output
// =============================================================================

#[tokio::test]
async fn test_mbtiles_job_writes_tiles_and_zoom_range() {
    let dir = TempDir::new().unwrap();
    let server = Arc::new(TileServer::default());
    let config = config(&dir).with_output_type(OutputType::Mbtiles);

    let (summary, location) = download(&server, config, &world_job(2), "world").await;
    assert_eq!(summary.succeeded, 21);

    let path = location.full_path();
    assert!(path.ends_with("world/tiles.mbtiles"));

    let conn = rusqlite::Connection::open(&path).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM tiles", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 21);
    drop(conn);

    let reopened = MbtilesBackend::open(&path).unwrap();
    assert_eq!(reopened.metadata_value("minzoom").unwrap().as_deref(), Some("0"));
    assert_eq!(reopened.metadata_value("maxzoom").unwrap().as_deref(), Some("2"));
    assert_eq!(reopened.metadata_value("format").unwrap().as_deref(), Some("png"));
}

// =============================================================================
// Repo output
// =============================================================================

#[tokio::test]
async fn test_repo_job_writes_manifest_with_counts() {
    let dir = TempDir::new().unwrap();
    let server = Arc::new(TileServer::default());
    let config = config(&dir).with_output_type(OutputType::Repo);

    let (summary, location) = download(&server, config, &world_job(2), "world").await;
    assert_eq!(summary.succeeded, 21);

    let root = location.full_path();
    assert!(root.ends_with("world/tiles.repo"));
    assert!(root.join("2/3/1.png").is_file());

    let manifest = RepoManifest::load(&root).unwrap();
    assert_eq!(manifest.metadata.min_zoom, 0);
    assert_eq!(manifest.metadata.max_zoom, 2);
    assert_eq!(manifest.tile_counts.get(&0), Some(&1));
    assert_eq!(manifest.tile_counts.get(&1), Some(&4));
    assert_eq!(manifest.tile_counts.get(&2), Some(&16));
}
