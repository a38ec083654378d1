//! Geographic bounding boxes.

use std::fmt;
use std::str::FromStr;

use geo::{coord, Rect};

use crate::config::ConfigError;
use crate::coord::{MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};

/// Axis-aligned lon/lat box in degrees.
///
/// `min_lon < max_lon` and `min_lat < max_lat` always hold; the constructor
/// rejects anything else.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    min_lon: f64,
    min_lat: f64,
    max_lon: f64,
    max_lat: f64,
}

impl BoundingBox {
    /// Creates a bounding box, validating ordering and ranges.
    ///
    /// Latitudes outside the Web Mercator range are clamped to it, since the
    /// projection is undefined at the poles.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self, ConfigError> {
        let values = [min_lon, min_lat, max_lon, max_lat];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::InvalidBounds(format!(
                "non-finite coordinate in {:?}",
                values
            )));
        }
        if !(MIN_LON..=MAX_LON).contains(&min_lon) || !(MIN_LON..=MAX_LON).contains(&max_lon) {
            return Err(ConfigError::InvalidBounds(format!(
                "longitude out of range [{}, {}]",
                MIN_LON, MAX_LON
            )));
        }
        if !(-90.0..=90.0).contains(&min_lat) || !(-90.0..=90.0).contains(&max_lat) {
            return Err(ConfigError::InvalidBounds(
                "latitude out of range [-90, 90]".to_string(),
            ));
        }
        if min_lon >= max_lon {
            return Err(ConfigError::InvalidBounds(format!(
                "min_lon {} must be less than max_lon {}",
                min_lon, max_lon
            )));
        }
        if min_lat >= max_lat {
            return Err(ConfigError::InvalidBounds(format!(
                "min_lat {} must be less than max_lat {}",
                min_lat, max_lat
            )));
        }

        let (clamped_min, clamped_max) =
            (min_lat.clamp(MIN_LAT, MAX_LAT), max_lat.clamp(MIN_LAT, MAX_LAT));
        if clamped_min >= clamped_max {
            return Err(ConfigError::InvalidBounds(format!(
                "latitudes {} to {} lie outside the Web Mercator range [{}, {}]",
                min_lat, max_lat, MIN_LAT, MAX_LAT
            )));
        }

        Ok(Self {
            min_lon,
            min_lat: clamped_min,
            max_lon,
            max_lat: clamped_max,
        })
    }

    /// Bounding box of a geo rectangle (x = lon, y = lat).
    pub fn from_rect(rect: Rect<f64>) -> Result<Self, ConfigError> {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }

    pub fn min_lon(&self) -> f64 {
        self.min_lon
    }

    pub fn min_lat(&self) -> f64 {
        self.min_lat
    }

    pub fn max_lon(&self) -> f64 {
        self.max_lon
    }

    pub fn max_lat(&self) -> f64 {
        self.max_lat
    }

    /// `[min_lon, min_lat, max_lon, max_lat]`, the order MBTiles metadata uses.
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }

    /// Midpoint as `(lon, lat)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.min_lon, y: self.min_lat },
            coord! { x: self.max_lon, y: self.max_lat },
        )
    }
}

/// Parses `"min_lon,min_lat,max_lon,max_lat"`.
impl FromStr for BoundingBox {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(ConfigError::InvalidBounds(format!(
                "expected min_lon,min_lat,max_lon,max_lat, got '{}'",
                s
            )));
        }

        let mut values = [0.0f64; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| ConfigError::InvalidBounds(format!("'{}' is not a number", part)))?;
        }

        Self::new(values[0], values[1], values[2], values[3])
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}
