//! Coordinate type definitions

use std::fmt;

use thiserror::Error;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Supported zoom levels.
///
/// Capped so that the children of a tile at `MAX_ZOOM` still fit in `u32`.
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 30;

/// Tile coordinates in the Web Mercator / Slippy Map system.
///
/// `x` grows eastward from the antimeridian, `y` grows southward from the
/// top edge of the projection. Both lie in `[0, 2^z)`.
///
/// Ordering is by zoom first, then row, then column, which is also the
/// natural download order of an enumerated job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    /// Zoom level
    pub z: u8,
    /// Row, 0 at north
    pub y: u32,
    /// Column, 0 at west
    pub x: u32,
}

impl TileCoord {
    /// Creates a tile coordinate.
    ///
    /// Does not validate; use [`TileCoord::is_valid`] or the checked
    /// conversions in [`crate::coord`] when the input is untrusted.
    #[inline]
    pub const fn new(x: u32, y: u32, z: u8) -> Self {
        Self { z, y, x }
    }

    /// Number of tiles along one axis at this zoom level.
    #[inline]
    pub fn axis_len(&self) -> u64 {
        1u64 << self.z
    }

    /// Returns true if x and y lie inside `[0, 2^z)` and the zoom is supported.
    pub fn is_valid(&self) -> bool {
        self.z <= MAX_ZOOM && (self.x as u64) < self.axis_len() && (self.y as u64) < self.axis_len()
    }

    /// Bing-style quadkey for this tile.
    pub fn quadkey(&self) -> String {
        super::tile_to_quadkey(self.x, self.y, self.z)
    }

    /// The four tiles at `z + 1` covering this tile, in NW, NE, SE, SW order.
    pub fn children(&self) -> [TileCoord; 4] {
        super::child_tiles(self.x, self.y, self.z)
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.x, self.y, self.z)
    }
}

/// Position of a child tile inside its parent.
///
/// The discriminant is the index of the child in [`TileCoord::children`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    NorthWest = 0,
    NorthEast = 1,
    SouthEast = 2,
    SouthWest = 3,
}

impl Quadrant {
    /// All quadrants in child order.
    pub const ALL: [Quadrant; 4] = [
        Quadrant::NorthWest,
        Quadrant::NorthEast,
        Quadrant::SouthEast,
        Quadrant::SouthWest,
    ];
}

/// Errors that can occur during coordinate conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Latitude is outside valid range (-85.05112878 to 85.05112878)
    #[error("Invalid latitude: {0} (must be between {min} and {max})", min = MIN_LAT, max = MAX_LAT)]
    InvalidLatitude(f64),
    /// Longitude is outside valid range (-180.0 to 180.0)
    #[error("Invalid longitude: {0} (must be between {min} and {max})", min = MIN_LON, max = MAX_LON)]
    InvalidLongitude(f64),
    /// Zoom level is outside valid range
    #[error("Invalid zoom level: {0} (must be between {min} and {max})", min = MIN_ZOOM, max = MAX_ZOOM)]
    InvalidZoom(u8),
    /// Quadkey contains invalid characters or is too long
    #[error(
        "Invalid quadkey: '{0}' (must contain only digits 0-3 and length <= {max})",
        max = MAX_ZOOM
    )]
    InvalidQuadkey(String),
}
