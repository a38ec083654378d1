//! Tile enumeration.
//!
//! Turns a bounding box, a zoom range and an optional polygon filter into
//! the [`Job`]: the deduplicated set of tiles to fetch.

use std::collections::BTreeSet;

use tracing::debug;

use crate::config::ConfigError;
use crate::coord::{lon_lat_to_tile, tile_bounds, TileCoord, MAX_ZOOM};
use crate::region::{BoundingBox, RegionFilter};

/// The set of tiles one download run covers.
///
/// Tiles are unique and iterate in `(z, y, x)` order. A job is built once
/// and only read afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    tiles: Vec<TileCoord>,
    bounds: BoundingBox,
    min_zoom: u8,
    max_zoom: u8,
}

impl Job {
    pub fn tiles(&self) -> &[TileCoord] {
        &self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn min_zoom(&self) -> u8 {
        self.min_zoom
    }

    pub fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    /// Number of tiles per zoom level, `min_zoom` first.
    pub fn count_per_zoom(&self) -> Vec<(u8, usize)> {
        (self.min_zoom..=self.max_zoom)
            .map(|z| (z, self.tiles.iter().filter(|t| t.z == z).count()))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TileCoord> {
        self.tiles.iter()
    }
}

impl IntoIterator for Job {
    type Item = TileCoord;
    type IntoIter = std::vec::IntoIter<TileCoord>;

    fn into_iter(self) -> Self::IntoIter {
        self.tiles.into_iter()
    }
}

/// Builds the job for `bounds` over `min_zoom..=max_zoom`.
///
/// The tile-index box at each zoom runs from the tile containing the
/// north-west corner to the one containing the south-east corner, clamped to
/// the grid. With a polygon filter only tiles whose extent intersects the
/// polygon are kept.
pub fn enumerate_tiles(
    bounds: &BoundingBox,
    min_zoom: u8,
    max_zoom: u8,
    filter: &RegionFilter,
) -> Result<Job, ConfigError> {
    if min_zoom > max_zoom || max_zoom > MAX_ZOOM {
        return Err(ConfigError::InvalidZoomRange {
            min: min_zoom,
            max: max_zoom,
        });
    }

    let mut tiles = BTreeSet::new();

    for z in min_zoom..=max_zoom {
        // North edge gives the smallest row
        let (x_min, y_min) = lon_lat_to_tile(bounds.min_lon(), bounds.max_lat(), z);
        let (x_max, y_max) = lon_lat_to_tile(bounds.max_lon(), bounds.min_lat(), z);

        let before = tiles.len();
        for y in y_min..=y_max {
            for x in x_min..=x_max {
                let tile = TileCoord::new(x, y, z);
                if filter.accepts(&tile_bounds(&tile)) {
                    tiles.insert(tile);
                }
            }
        }

        debug!(
            zoom = z,
            x_range = ?(x_min, x_max),
            y_range = ?(y_min, y_max),
            kept = tiles.len() - before,
            "Enumerated zoom level"
        );
    }

    Ok(Job {
        tiles: tiles.into_iter().collect(),
        bounds: *bounds,
        min_zoom,
        max_zoom,
    })
}
