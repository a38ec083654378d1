//! Tile URL templates.

use std::fmt;

use crate::coord::{tile_to_quadkey, TileCoord};

/// A tile-server URL with placeholders.
///
/// Recognised placeholders:
///
/// | placeholder  | value                              |
/// |--------------|------------------------------------|
/// | `{x}`        | tile column                        |
/// | `{y}`        | tile row                           |
/// | `{z}`        | zoom level                         |
/// | `{quad}`     | Bing quadkey                       |
/// | `{scale:22}` | `23 - 2 * z` (negative above z 11) |
///
/// Unknown placeholders are left untouched.
///
/// # Example
///
/// ```
/// use tilefetch::coord::TileCoord;
/// use tilefetch::provider::UrlTemplate;
///
/// let template = UrlTemplate::new("https://tiles.example.com/{z}/{x}/{y}.png");
/// assert_eq!(
///     template.resolve(&TileCoord::new(3, 5, 4)),
///     "https://tiles.example.com/4/3/5.png"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate(String);

impl UrlTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the template addresses tiles at all.
    pub fn has_placeholders(&self) -> bool {
        has_tile_placeholders(&self.0)
    }

    /// Substitutes every placeholder for `tile`.
    pub fn resolve(&self, tile: &TileCoord) -> String {
        substitute(&self.0, tile)
    }
}

/// Replaces the tile placeholders in any pattern, URL or file path.
pub fn substitute(pattern: &str, tile: &TileCoord) -> String {
    let scale22 = 23 - 2 * i32::from(tile.z);
    let mut out = pattern
        .replace("{x}", &tile.x.to_string())
        .replace("{y}", &tile.y.to_string())
        .replace("{z}", &tile.z.to_string())
        .replace("{scale:22}", &scale22.to_string());
    if out.contains("{quad}") {
        out = out.replace("{quad}", &tile_to_quadkey(tile.x, tile.y, tile.z));
    }
    out
}

/// Whether `pattern` addresses individual tiles.
pub fn has_tile_placeholders(pattern: &str) -> bool {
    ["{x}", "{y}", "{z}", "{quad}"]
        .iter()
        .any(|p| pattern.contains(p))
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UrlTemplate {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for UrlTemplate {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xyz_substitution() {
        let template = UrlTemplate::new("http://t/{z}/{x}/{y}.png");
        assert_eq!(
            template.resolve(&TileCoord::new(19295, 24640, 16)),
            "http://t/16/19295/24640.png"
        );
    }

    #[test]
    fn test_quadkey_substitution() {
        let template = UrlTemplate::new("http://ecn.t0.tiles.virtualearth.net/tiles/a{quad}.jpeg?g=1");
        assert_eq!(
            template.resolve(&TileCoord::new(3, 5, 3)),
            "http://ecn.t0.tiles.virtualearth.net/tiles/a213.jpeg?g=1"
        );
    }

    #[test]
    fn test_scale22_can_go_negative() {
        let template = UrlTemplate::new("http://t/{scale:22}/{x}/{y}");
        assert_eq!(template.resolve(&TileCoord::new(0, 0, 0)), "http://t/23/0/0");
        assert_eq!(template.resolve(&TileCoord::new(0, 0, 11)), "http://t/1/0/0");
        assert_eq!(template.resolve(&TileCoord::new(0, 0, 15)), "http://t/-7/0/0");
    }

    #[test]
    fn test_repeated_and_unknown_placeholders() {
        let template = UrlTemplate::new("http://{x}.t/{x}/{s}/{y}");
        assert_eq!(template.resolve(&TileCoord::new(1, 2, 3)), "http://1.t/1/{s}/2");
    }

    #[test]
    fn test_has_placeholders() {
        assert!(UrlTemplate::new("http://t/{quad}").has_placeholders());
        assert!(!UrlTemplate::new("http://t/static.png").has_placeholders());
    }
}
