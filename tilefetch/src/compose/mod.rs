//! 2x tile composition.
//!
//! A scale-2 tile at `(x, y, z)` is built from its four children at `z + 1`.
//! The children are fetched concurrently, decoded, and pasted onto a canvas
//! twice their size:
//!
//! ```text
//! +----+----+
//! | NW | NE |
//! +----+----+
//! | SW | SE |
//! +----+----+
//! ```
//!
//! Missing children leave their quadrant transparent. The tile only fails
//! when no child is usable or the usable ones disagree in size.

use std::io::Cursor;
use std::path::Path;

use futures::future::join_all;
use image::{DynamicImage, ImageFormat, ImageReader, RgbaImage};
use tracing::debug;

use crate::coord::Quadrant;
use crate::fetch::{write_verified, FailureKind, FetchOutcome, FetchRequest, Fetcher};
use crate::provider::AsyncHttpClient;

/// Why four children could not be merged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComposeError {
    #[error("all four child tiles are missing or undecodable")]
    AllChildrenMissing,

    #[error("child tile sizes differ: expected {expected:?}, found {found:?}")]
    ChildSizeMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },
}

impl ComposeError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::AllChildrenMissing => FailureKind::AllChildrenMissing,
            Self::ChildSizeMismatch { .. } => FailureKind::ChildSizeMismatch,
        }
    }
}

/// Merges decoded children, indexed by [`Quadrant`], into one canvas.
///
/// The canvas is `2w x 2h` where `w x h` is the common child size. NW goes
/// at the origin, NE at `(W - w, 0)`, SE at `(W - w, H - h)` and SW at
/// `(0, H - h)`.
pub fn merge_quadrants(children: &[Option<RgbaImage>; 4]) -> Result<RgbaImage, ComposeError> {
    let mut present = children.iter().flatten();
    let first = present.next().ok_or(ComposeError::AllChildrenMissing)?;
    let (w, h) = first.dimensions();

    if let Some(other) = present.find(|img| img.dimensions() != (w, h)) {
        return Err(ComposeError::ChildSizeMismatch {
            expected: (w, h),
            found: other.dimensions(),
        });
    }

    let (canvas_w, canvas_h) = (w * 2, h * 2);
    // Zeroed pixels are fully transparent
    let mut canvas = RgbaImage::new(canvas_w, canvas_h);

    for quadrant in Quadrant::ALL {
        if let Some(child) = &children[quadrant as usize] {
            let (x, y) = match quadrant {
                Quadrant::NorthWest => (0, 0),
                Quadrant::NorthEast => (canvas_w - w, 0),
                Quadrant::SouthEast => (canvas_w - w, canvas_h - h),
                Quadrant::SouthWest => (0, canvas_h - h),
            };
            image::imageops::replace(&mut canvas, child, i64::from(x), i64::from(y));
        }
    }

    Ok(canvas)
}

/// Decodes an image in any enabled format; `None` if it cannot be read.
fn decode(bytes: &[u8]) -> Option<RgbaImage> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?;
    match reader.decode() {
        Ok(img) => Some(img.to_rgba8()),
        Err(e) => {
            debug!(error = %e, "Child tile is not a decodable image");
            None
        }
    }
}

fn encode_png(canvas: RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(canvas).write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

/// Renders 2x tiles by fetching and merging children.
pub struct ScaleCompositor<C> {
    fetcher: Fetcher<C>,
}

impl<C: AsyncHttpClient> ScaleCompositor<C> {
    pub fn new(fetcher: Fetcher<C>) -> Self {
        Self { fetcher }
    }

    /// Renders the request's tile as PNG bytes.
    ///
    /// Returns only after all four child fetches have resolved.
    pub async fn render(&self, request: &FetchRequest) -> FetchOutcome {
        let tile = request.tile;
        let children = tile.children();

        let fetches = children.iter().map(|child| {
            let child_request = request.for_child(*child);
            async move { self.fetcher.fetch(&child_request).await }
        });
        let outcomes = join_all(fetches).await;
        if outcomes.iter().any(FetchOutcome::is_cancelled) {
            return FetchOutcome::cancelled();
        }

        let mut decoded: [Option<RgbaImage>; 4] = [None, None, None, None];
        for (slot, (child, outcome)) in decoded.iter_mut().zip(children.iter().zip(outcomes)) {
            match outcome {
                FetchOutcome::Success { bytes } => *slot = decode(&bytes),
                other => debug!(
                    tile = %tile,
                    child = %child,
                    outcome = %other,
                    "Child tile missing"
                ),
            }
        }

        let canvas = match merge_quadrants(&decoded) {
            Ok(canvas) => canvas,
            Err(e) => return FetchOutcome::failed(e.kind(), e.to_string()),
        };

        match encode_png(canvas) {
            Ok(bytes) => FetchOutcome::Success { bytes },
            Err(e) => {
                FetchOutcome::failed(FailureKind::Internal, format!("PNG encode failed: {}", e))
            }
        }
    }

    /// Renders the tile and writes the PNG to `path`.
    pub async fn render_to_file(&self, request: &FetchRequest, path: &Path) -> FetchOutcome {
        match self.render(request).await {
            FetchOutcome::Success { bytes } => match write_verified(path, &bytes).await {
                Ok(()) => FetchOutcome::Success { bytes },
                Err(e) => FetchOutcome::failed(FailureKind::Internal, e.to_string()),
            },
            other => other,
        }
    }
}
