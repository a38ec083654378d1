//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (longitude/latitude)
//! and Web Mercator tile coordinates, Bing quadkeys, and the parent/child
//! relation used for 2x output.

mod types;


pub use types::{
    CoordError, Quadrant, TileCoord, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON, MIN_ZOOM,
};

use geo::{coord, Rect};
use std::f64::consts::PI;

/// Projects a longitude/latitude pair to tile indices at `zoom`.
///
/// Latitude must lie inside the Web Mercator range ([`MIN_LAT`], [`MAX_LAT`]);
/// outside of it the row is meaningless. The result is clamped into
/// `[0, 2^zoom)` so that the eastern and southern edges (lon = 180) land on
/// the last column/row.
#[inline]
pub fn lon_lat_to_tile(lon: f64, lat: f64, zoom: u8) -> (u32, u32) {
    let n = 2.0_f64.powi(zoom as i32);
    let last = (n - 1.0).max(0.0);

    let x = ((lon + 180.0) / 360.0 * n).floor();

    let lat_rad = lat.to_radians();
    let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n).floor();

    (x.clamp(0.0, last) as u32, y.clamp(0.0, last) as u32)
}

/// Converts geographic coordinates to a tile, validating the input.
///
/// # Arguments
///
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
/// * `zoom` - Zoom level (0 to [`MAX_ZOOM`])
pub fn to_tile_coords(lon: f64, lat: f64, zoom: u8) -> Result<TileCoord, CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    let (x, y) = lon_lat_to_tile(lon, lat, zoom);
    Ok(TileCoord::new(x, y, zoom))
}

/// Returns the longitude/latitude of a tile's north-west corner.
///
/// Passing `x + 1` / `y + 1` yields the other corners, which is how
/// [`tile_bounds`] builds a tile's extent.
#[inline]
pub fn tile_to_lon_lat(x: u32, y: u32, zoom: u8) -> (f64, f64) {
    let n = 2.0_f64.powi(zoom as i32);

    let lon = x as f64 / n * 360.0 - 180.0;

    let lat_rad = (PI * (1.0 - 2.0 * y as f64 / n)).sinh().atan();
    let lat = lat_rad.to_degrees();

    (lon, lat)
}

/// Geographic extent of a tile as a lon/lat rectangle.
pub fn tile_bounds(tile: &TileCoord) -> Rect<f64> {
    let (west, north) = tile_to_lon_lat(tile.x, tile.y, tile.z);
    let (east, south) = tile_to_lon_lat(tile.x + 1, tile.y + 1, tile.z);
    Rect::new(coord! { x: west, y: south }, coord! { x: east, y: north })
}

/// Encodes a tile as a Bing Maps quadkey.
///
/// Digit `i` (from the most significant bit) is `2 * bit(y) + bit(x)`, so
/// the string has exactly `zoom` characters. Zoom 0 yields an empty string.
pub fn tile_to_quadkey(x: u32, y: u32, zoom: u8) -> String {
    let mut quadkey = String::with_capacity(zoom as usize);
    for bit in (1..=zoom as u32).rev() {
        let mask = 1u32 << (bit - 1);
        let mut digit = b'0';
        if x & mask != 0 {
            digit += 1;
        }
        if y & mask != 0 {
            digit += 2;
        }
        quadkey.push(digit as char);
    }
    quadkey
}

/// Decodes a Bing Maps quadkey back into tile coordinates.
pub fn quadkey_to_tile(quadkey: &str) -> Result<TileCoord, CoordError> {
    if quadkey.len() > MAX_ZOOM as usize {
        return Err(CoordError::InvalidQuadkey(quadkey.to_string()));
    }

    let mut x = 0u32;
    let mut y = 0u32;
    for ch in quadkey.chars() {
        x <<= 1;
        y <<= 1;
        match ch {
            '0' => {}
            '1' => x |= 1,
            '2' => y |= 1,
            '3' => {
                x |= 1;
                y |= 1;
            }
            _ => return Err(CoordError::InvalidQuadkey(quadkey.to_string())),
        }
    }

    Ok(TileCoord::new(x, y, quadkey.len() as u8))
}

/// The four tiles at `zoom + 1` that cover tile `(x, y, zoom)`.
///
/// The order is fixed: north-west, north-east, south-east, south-west.
/// [`Quadrant`] discriminants index into this array.
#[inline]
pub fn child_tiles(x: u32, y: u32, zoom: u8) -> [TileCoord; 4] {
    let cx = x * 2;
    let cy = y * 2;
    let cz = zoom + 1;
    [
        TileCoord::new(cx, cy, cz),
        TileCoord::new(cx + 1, cy, cz),
        TileCoord::new(cx + 1, cy + 1, cz),
        TileCoord::new(cx, cy + 1, cz),
    ]
}
