//! Job configuration errors.

use thiserror::Error;

/// Problems with the job description that abort before any tile is fetched.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Bounding box is malformed or degenerate
    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),

    /// `min_zoom` is greater than `max_zoom` or beyond the supported range
    #[error("Invalid zoom range {min}..={max}")]
    InvalidZoomRange { min: u8, max: u8 },

    /// Polygon input has no rings
    #[error("Polygon has no rings")]
    EmptyPolygon,

    /// GeoJSON geometry is not a Polygon or MultiPolygon
    #[error("Unsupported geometry type '{0}': expected Polygon or MultiPolygon")]
    UnsupportedGeometry(String),

    /// GeoJSON document could not be read or parsed
    #[error("Invalid GeoJSON: {0}")]
    InvalidGeoJson(String),

    /// Only 1x and 2x output is supported
    #[error("Unsupported output scale: {0} (must be 1 or 2)")]
    UnsupportedScale(u8),

    /// Worker pool size out of range
    #[error("Invalid worker count {0}")]
    InvalidWorkers(usize),

    /// Retry policy needs at least one attempt
    #[error("max attempts must be at least 1")]
    ZeroAttempts,

    /// Unknown output backend name
    #[error("Unknown output type '{0}' (expected directory, mbtiles or repo)")]
    UnknownOutputType(String),
}
