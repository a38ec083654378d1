//! Units of fetch work.

use std::fmt;

use super::RetryPolicy;
use crate::config::ConfigError;
use crate::coord::TileCoord;
use crate::provider::UrlTemplate;

/// Output resolution relative to the source tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scale {
    /// Tiles are stored as fetched.
    #[default]
    One,
    /// Each tile is composed from its four children at `z + 1`.
    Two,
}

impl Scale {
    pub fn factor(self) -> u32 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

impl TryFrom<u8> for Scale {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(ConfigError::UnsupportedScale(other)),
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.factor())
    }
}

/// Everything needed to fetch one tile.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub tile: TileCoord,
    pub url_template: UrlTemplate,
    pub scale: Scale,
    pub retry_policy: RetryPolicy,
}

impl FetchRequest {
    pub fn new(
        tile: TileCoord,
        url_template: UrlTemplate,
        scale: Scale,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            tile,
            url_template,
            scale,
            retry_policy,
        }
    }

    /// Request for a child tile, fetched as-is.
    pub fn for_child(&self, child: TileCoord) -> Self {
        Self {
            tile: child,
            url_template: self.url_template.clone(),
            scale: Scale::One,
            retry_policy: self.retry_policy,
        }
    }

    /// URL for this request's tile.
    pub fn url(&self) -> String {
        self.url_template.resolve(&self.tile)
    }
}
