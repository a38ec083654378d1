//! GeoJSON region loading.
//!
//! Accepts a `Feature`, a `FeatureCollection` (the first Polygon or
//! MultiPolygon feature wins) or a bare geometry, and converts it into a
//! [`geo::MultiPolygon`] with its bounding box.

use std::path::Path;

use geo::{BoundingRect, Coord, LineString, MultiPolygon, Polygon};
use geojson::{GeoJson, Value};

use super::{BoundingBox, RegionFilter};
use crate::config::ConfigError;

/// A polygon region read from GeoJSON.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoJsonRegion {
    pub bounds: BoundingBox,
    pub filter: RegionFilter,
}

/// Reads and parses a GeoJSON file.
pub fn load_geojson_file(path: &Path) -> Result<GeoJsonRegion, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::InvalidGeoJson(format!("cannot read {}: {}", path.display(), e))
    })?;
    parse_geojson(&content)
}

/// Parses GeoJSON text into a region.
pub fn parse_geojson(content: &str) -> Result<GeoJsonRegion, ConfigError> {
    let doc: GeoJson = content
        .parse()
        .map_err(|e: geojson::Error| ConfigError::InvalidGeoJson(e.to_string()))?;

    let value = match doc {
        GeoJson::Geometry(geometry) => geometry.value,
        GeoJson::Feature(feature) => {
            feature
                .geometry
                .ok_or_else(|| ConfigError::InvalidGeoJson("feature has no geometry".to_string()))?
                .value
        }
        GeoJson::FeatureCollection(collection) => {
            if collection.features.is_empty() {
                return Err(ConfigError::InvalidGeoJson(
                    "empty FeatureCollection".to_string(),
                ));
            }
            collection
                .features
                .into_iter()
                .filter_map(|f| f.geometry)
                .map(|g| g.value)
                .find(|v| matches!(v, Value::Polygon(_) | Value::MultiPolygon(_)))
                .ok_or_else(|| {
                    ConfigError::UnsupportedGeometry(
                        "FeatureCollection without Polygon features".to_string(),
                    )
                })?
        }
    };

    let polygon = to_multi_polygon(value)?;
    let rect = polygon.bounding_rect().ok_or(ConfigError::EmptyPolygon)?;
    let bounds = BoundingBox::from_rect(rect)?;
    let filter = RegionFilter::polygon(polygon)?;

    Ok(GeoJsonRegion { bounds, filter })
}

fn to_multi_polygon(value: Value) -> Result<MultiPolygon<f64>, ConfigError> {
    match value {
        Value::Polygon(rings) => Ok(MultiPolygon::new(vec![to_polygon(rings)?])),
        Value::MultiPolygon(parts) => parts
            .into_iter()
            .map(to_polygon)
            .collect::<Result<Vec<_>, _>>()
            .map(MultiPolygon::new),
        other => Err(ConfigError::UnsupportedGeometry(
            geometry_name(&other).to_string(),
        )),
    }
}

fn to_polygon(rings: Vec<Vec<Vec<f64>>>) -> Result<Polygon<f64>, ConfigError> {
    let mut rings = rings.into_iter().map(to_ring);
    let exterior = match rings.next() {
        Some(ring) => ring?,
        None => return Err(ConfigError::EmptyPolygon),
    };
    let interiors = rings.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn to_ring(positions: Vec<Vec<f64>>) -> Result<LineString<f64>, ConfigError> {
    positions
        .into_iter()
        .map(|p| match p.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => Err(ConfigError::InvalidGeoJson(format!(
                "position needs at least two values, got {:?}",
                p
            ))),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}

fn geometry_name(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}
