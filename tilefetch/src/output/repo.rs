//! Repository-style output: a tile tree plus a JSON manifest.
//!
//! ```text
//! <full_path>/
//!   repo.json
//!   <z>/<x>/<y>.<format>
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{BackendGuard, OutputBackend, OutputError, TilesetMetadata};
use crate::coord::TileCoord;
use crate::fetch::Scale;

/// Manifest file name inside the repository directory.
pub const MANIFEST_FILE: &str = "repo.json";

/// Contents of `repo.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoManifest {
    pub metadata: TilesetMetadata,
    /// Stored tiles per zoom level, filled in by `close`
    #[serde(default)]
    pub tile_counts: BTreeMap<u8, u64>,
}

impl RepoManifest {
    /// Reads the manifest of the repository at `root`.
    pub fn load(root: &Path) -> Result<Self, OutputError> {
        let path = root.join(MANIFEST_FILE);
        let text = fs::read_to_string(&path).map_err(|e| OutputError::io(&path, e))?;
        Ok(serde_json::from_str(&text)?)
    }

    fn save(&self, root: &Path) -> Result<(), OutputError> {
        fs::create_dir_all(root).map_err(|e| OutputError::io(root, e))?;
        let path = root.join(MANIFEST_FILE);
        let text = serde_json::to_string_pretty(self)?;
        fs::write(&path, text).map_err(|e| OutputError::io(&path, e))
    }
}

/// Tile tree rooted at the container path.
pub struct RepoBackend {
    root: PathBuf,
    metadata: Mutex<Option<TilesetMetadata>>,
}

impl RepoBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            metadata: Mutex::new(None),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn extension(&self) -> String {
        self.metadata
            .lock()
            .as_ref()
            .map(|m| m.format.clone())
            .unwrap_or_else(|| "png".to_string())
    }

    fn tile_path(&self, tile: &TileCoord) -> PathBuf {
        self.root
            .join(tile.z.to_string())
            .join(tile.x.to_string())
            .join(format!("{}.{}", tile.y, self.extension()))
    }
}

/// Counts files under every numeric zoom directory of `root`.
fn count_tiles(root: &Path) -> Result<BTreeMap<u8, u64>, OutputError> {
    let mut counts = BTreeMap::new();
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(counts),
        Err(e) => return Err(OutputError::io(root, e)),
    };

    for entry in entries {
        let entry = entry.map_err(|e| OutputError::io(root, e))?;
        let Some(zoom) = entry
            .file_name()
            .to_str()
            .and_then(|name| name.parse::<u8>().ok())
        else {
            continue;
        };
        let zoom_dir = entry.path();
        if !zoom_dir.is_dir() {
            continue;
        }

        let mut count = 0u64;
        for column in fs::read_dir(&zoom_dir).map_err(|e| OutputError::io(&zoom_dir, e))? {
            let column = column.map_err(|e| OutputError::io(&zoom_dir, e))?.path();
            if !column.is_dir() {
                continue;
            }
            for tile in fs::read_dir(&column).map_err(|e| OutputError::io(&column, e))? {
                let tile = tile.map_err(|e| OutputError::io(&column, e))?;
                if tile.path().is_file() {
                    count += 1;
                }
            }
        }
        counts.insert(zoom, count);
    }
    Ok(counts)
}

impl OutputBackend for RepoBackend {
    fn name(&self) -> &'static str {
        "repo"
    }

    fn exists(&self, _target: &Path, tile: &TileCoord) -> bool {
        fs::metadata(self.tile_path(tile))
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false)
    }

    fn add_tile(
        &self,
        _guard: &BackendGuard<'_>,
        _target: &Path,
        source: &Path,
        tile: &TileCoord,
        _scale: Scale,
    ) -> Result<(), OutputError> {
        let path = self.tile_path(tile);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| OutputError::io(parent, e))?;
        }
        fs::copy(source, &path).map_err(|e| OutputError::io(&path, e))?;
        trace!(tile = %tile, path = %path.display(), "Tile stored in repo");
        Ok(())
    }

    fn add_metadata(
        &self,
        _guard: &BackendGuard<'_>,
        metadata: &TilesetMetadata,
    ) -> Result<(), OutputError> {
        let manifest = RepoManifest {
            metadata: metadata.clone(),
            tile_counts: BTreeMap::new(),
        };
        manifest.save(&self.root)?;
        *self.metadata.lock() = Some(metadata.clone());
        Ok(())
    }

    fn close(
        &self,
        _guard: &BackendGuard<'_>,
        _output_dir: &Path,
        _full_path: &Path,
        min_zoom: u8,
        max_zoom: u8,
    ) -> Result<(), OutputError> {
        let recorded = self.metadata.lock().clone();
        let mut metadata = match recorded {
            Some(metadata) => metadata,
            None => match RepoManifest::load(&self.root) {
                Ok(manifest) => manifest.metadata,
                Err(OutputError::Io { .. }) => return Err(OutputError::MissingMetadata),
                Err(e) => return Err(e),
            },
        };
        metadata.min_zoom = min_zoom;
        metadata.max_zoom = max_zoom;

        let manifest = RepoManifest {
            metadata,
            tile_counts: count_tiles(&self.root)?,
        };
        manifest.save(&self.root)?;
        debug!(
            path = %self.root.display(),
            zoom_levels = manifest.tile_counts.len(),
            "Repo manifest written"
        );
        Ok(())
    }
}
