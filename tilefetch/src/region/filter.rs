//! Polygon filtering of candidate tiles.

use geo::{Intersects, MultiPolygon, Polygon, Rect};

use crate::config::ConfigError;

/// Restricts enumeration to tiles intersecting a polygon.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RegionFilter {
    /// Every tile in the bounding box is kept.
    #[default]
    None,
    /// Only tiles whose extent intersects the (multi-part, holed) polygon.
    Polygon(MultiPolygon<f64>),
}

impl RegionFilter {
    /// Builds a polygon filter, rejecting input with no rings.
    pub fn polygon(polygon: MultiPolygon<f64>) -> Result<Self, ConfigError> {
        let has_ring = polygon
            .0
            .iter()
            .any(|p| !p.exterior().0.is_empty());
        if !has_ring {
            return Err(ConfigError::EmptyPolygon);
        }
        Ok(Self::Polygon(polygon))
    }

    /// Whether a tile extent survives the filter. Boundary contact counts.
    pub fn accepts(&self, tile_rect: &Rect<f64>) -> bool {
        match self {
            Self::None => true,
            Self::Polygon(polygon) => polygon.intersects(tile_rect),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl TryFrom<Polygon<f64>> for RegionFilter {
    type Error = ConfigError;

    fn try_from(polygon: Polygon<f64>) -> Result<Self, Self::Error> {
        Self::polygon(MultiPolygon::new(vec![polygon]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{coord, polygon, LineString};

    fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Rect<f64> {
        Rect::new(coord! { x: min_x, y: min_y }, coord! { x: max_x, y: max_y })
    }

    #[test]
    fn test_none_accepts_everything() {
        assert!(RegionFilter::None.accepts(&rect(0.0, 0.0, 1.0, 1.0)));
    }

    #[test]
    fn test_empty_polygon_rejected() {
        let empty = MultiPolygon::<f64>::new(vec![]);
        assert!(matches!(
            RegionFilter::polygon(empty),
            Err(ConfigError::EmptyPolygon)
        ));

        let no_ring = Polygon::new(LineString::new(vec![]), vec![]);
        assert!(matches!(
            RegionFilter::try_from(no_ring),
            Err(ConfigError::EmptyPolygon)
        ));
    }

    #[test]
    fn test_intersection_and_disjoint() {
        let square = polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
        ];
        let filter = RegionFilter::try_from(square).unwrap();
        assert!(filter.accepts(&rect(5.0, 5.0, 15.0, 15.0)));
        assert!(!filter.accepts(&rect(20.0, 20.0, 30.0, 30.0)));
    }

    #[test]
    fn test_boundary_touch_counts() {
        let square = polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
        ];
        let filter = RegionFilter::try_from(square).unwrap();
        assert!(filter.accepts(&rect(10.0, 0.0, 20.0, 10.0)));
    }

    #[test]
    fn test_tile_inside_hole_is_rejected() {
        let holed = polygon!(
            exterior: [
                (x: 0.0, y: 0.0),
                (x: 100.0, y: 0.0),
                (x: 100.0, y: 100.0),
                (x: 0.0, y: 100.0),
            ],
            interiors: [
                [
                    (x: 20.0, y: 20.0),
                    (x: 80.0, y: 20.0),
                    (x: 80.0, y: 80.0),
                    (x: 20.0, y: 80.0),
                ],
            ],
        );
        let filter = RegionFilter::try_from(holed).unwrap();
        assert!(!filter.accepts(&rect(40.0, 40.0, 60.0, 60.0)));
        assert!(filter.accepts(&rect(5.0, 5.0, 15.0, 15.0)));
    }
}
