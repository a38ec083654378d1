//! Download regions: bounding boxes and polygon filters.

mod bounds;
mod filter;
mod source;

pub use bounds::BoundingBox;
pub use filter::RegionFilter;
pub use source::{load_geojson_file, parse_geojson, GeoJsonRegion};
