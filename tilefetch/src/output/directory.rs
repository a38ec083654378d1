//! Flat directory output: one file per tile.

use std::fs;
use std::path::Path;

use tracing::trace;

use super::{BackendGuard, OutputBackend, OutputError, TilesetMetadata};
use crate::coord::TileCoord;
use crate::fetch::Scale;

/// Copies each tile to its resolved target path.
#[derive(Debug, Default)]
pub struct DirectoryBackend;

impl DirectoryBackend {
    pub fn new() -> Self {
        Self
    }
}

impl OutputBackend for DirectoryBackend {
    fn name(&self) -> &'static str {
        "directory"
    }

    fn exists(&self, target: &Path, _tile: &TileCoord) -> bool {
        fs::metadata(target)
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false)
    }

    fn add_tile(
        &self,
        _guard: &BackendGuard<'_>,
        target: &Path,
        source: &Path,
        tile: &TileCoord,
        _scale: Scale,
    ) -> Result<(), OutputError> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| OutputError::io(parent, e))?;
        }
        let bytes = fs::copy(source, target).map_err(|e| OutputError::io(target, e))?;
        trace!(tile = %tile, path = %target.display(), bytes = bytes, "Tile written");
        Ok(())
    }

    fn add_metadata(
        &self,
        _guard: &BackendGuard<'_>,
        _metadata: &TilesetMetadata,
    ) -> Result<(), OutputError> {
        Ok(())
    }

    fn close(
        &self,
        _guard: &BackendGuard<'_>,
        _output_dir: &Path,
        _full_path: &Path,
        _min_zoom: u8,
        _max_zoom: u8,
    ) -> Result<(), OutputError> {
        Ok(())
    }
}
