//! tilefetch - resilient parallel raster map tile downloader
//!
//! Fetches the tiles of a geographic region from a templated tile-server URL
//! and writes them to a directory, an MBTiles file or a tile repository.
//!
//! ```ignore
//! use std::sync::Arc;
//! use tilefetch::config::DownloadConfig;
//! use tilefetch::dispatch::Coordinator;
//! use tilefetch::enumerate::enumerate_tiles;
//! use tilefetch::output::{create_backend, OutputLocation, OutputType};
//! use tilefetch::provider::{AsyncReqwestClient, UrlTemplate};
//! use tilefetch::region::{BoundingBox, RegionFilter};
//!
//! let bounds: BoundingBox = "-74.02,40.70,-73.93,40.80".parse()?;
//! let job = enumerate_tiles(&bounds, 10, 14, &RegionFilter::None)?;
//!
//! let config = DownloadConfig::default();
//! let location = OutputLocation::new(config.output_root(), "nyc", config.output_file(), OutputType::Mbtiles);
//! let backend = create_backend(OutputType::Mbtiles, &location)?;
//!
//! let coordinator = Coordinator::new(Arc::new(AsyncReqwestClient::new()?), backend, config);
//! let template = UrlTemplate::new("https://tile.openstreetmap.org/{z}/{x}/{y}.png");
//! let summary = coordinator.run(&job, &template, &location, &Default::default()).await?;
//! ```

pub mod compose;
pub mod config;
pub mod coord;
pub mod dispatch;
pub mod enumerate;
pub mod fetch;
pub mod logging;
pub mod output;
pub mod provider;
pub mod region;

/// Version of the tilefetch library and CLI.
///
/// Synchronized across the workspace through `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
