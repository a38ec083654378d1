//! Tileset metadata passed to `add_metadata`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::OutputLocation;
use crate::config::defaults::{
    DEFAULT_DESCRIPTION, DEFAULT_PROFILE, DEFAULT_TILE_FORMAT, DEFAULT_TILE_SIZE,
};
use crate::fetch::Scale;
use crate::region::BoundingBox;

/// Descriptive data about the tileset being written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilesetMetadata {
    /// `<output_root>/<output_dir>`
    pub output_dir: PathBuf,
    /// Container file or tile pattern path
    pub full_path: PathBuf,
    pub file_name: String,
    pub description: String,
    pub format: String,
    /// `[min_lon, min_lat, max_lon, max_lat]`
    pub bounds: [f64; 4],
    /// `[lon, lat, zoom]`
    pub center: [f64; 3],
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub profile: String,
    /// Pixel edge of stored tiles (256 at 1x, 512 at 2x)
    pub tile_size: u32,
}

impl TilesetMetadata {
    /// Metadata for a job covering `bounds` over `min_zoom..=max_zoom`.
    ///
    /// The center zoom is the integer midpoint of the zoom range.
    pub fn for_job(
        location: &OutputLocation,
        bounds: &BoundingBox,
        min_zoom: u8,
        max_zoom: u8,
        scale: Scale,
    ) -> Self {
        let (center_lon, center_lat) = bounds.center();
        let center_zoom = (u16::from(min_zoom) + u16::from(max_zoom)) / 2;

        Self {
            output_dir: location.output_path().to_path_buf(),
            full_path: location.full_path(),
            file_name: location.file_name().to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            format: DEFAULT_TILE_FORMAT.to_string(),
            bounds: bounds.to_array(),
            center: [center_lon, center_lat, f64::from(center_zoom)],
            min_zoom,
            max_zoom,
            profile: DEFAULT_PROFILE.to_string(),
            tile_size: DEFAULT_TILE_SIZE * scale.factor(),
        }
    }
}
