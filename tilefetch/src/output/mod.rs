//! Output backends
//!
//! Finished tiles leave the pipeline through an [`OutputBackend`]. Three
//! variants exist, selected by [`OutputType`]:
//!
//! - [`DirectoryBackend`]: one file per tile under a path pattern
//! - [`MbtilesBackend`]: a single SQLite file in the MBTiles layout
//! - [`RepoBackend`]: a `{z}/{x}/{y}` directory tree with a `repo.json` manifest
//!
//! Mutating calls require a [`BackendGuard`] from the job's [`BackendLock`].

mod directory;
mod lock;
mod mbtiles;
mod metadata;
mod repo;

pub use directory::DirectoryBackend;
pub use lock::{BackendGuard, BackendLock};
pub use mbtiles::MbtilesBackend;
pub use metadata::TilesetMetadata;
pub use repo::{RepoBackend, RepoManifest};

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::config::ConfigError;
use crate::coord::TileCoord;
use crate::fetch::Scale;
use crate::provider::{has_tile_placeholders, substitute};

/// Errors raised by output backends.
#[derive(Debug, Error)]
pub enum OutputError {
    /// File system operation failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// MBTiles database error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Manifest serialization error
    #[error("Manifest error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend used after `close`
    #[error("Output backend is closed")]
    Closed,

    /// `close` needs metadata that was never written
    #[error("No tileset metadata recorded before close")]
    MissingMetadata,
}

impl OutputError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Storage capability the dispatcher writes tiles through.
///
/// Implementations perform short blocking I/O. `exists` may be called
/// without the lock and must tolerate concurrent writers.
pub trait OutputBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Whether `tile` is already stored.
    fn exists(&self, target: &Path, tile: &TileCoord) -> bool;

    /// Stores the image at `source` as `tile`.
    fn add_tile(
        &self,
        guard: &BackendGuard<'_>,
        target: &Path,
        source: &Path,
        tile: &TileCoord,
        scale: Scale,
    ) -> Result<(), OutputError>;

    /// Records tileset metadata. Called once, before any tile.
    fn add_metadata(
        &self,
        guard: &BackendGuard<'_>,
        metadata: &TilesetMetadata,
    ) -> Result<(), OutputError>;

    /// Finalises the output. Called once, after the last tile.
    fn close(
        &self,
        guard: &BackendGuard<'_>,
        output_dir: &Path,
        full_path: &Path,
        min_zoom: u8,
        max_zoom: u8,
    ) -> Result<(), OutputError>;
}

/// Backend variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputType {
    #[default]
    Directory,
    Mbtiles,
    Repo,
}

impl OutputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::Mbtiles => "mbtiles",
            Self::Repo => "repo",
        }
    }

    /// File name used when a container variant is given a tile pattern.
    fn default_container_name(&self) -> Option<&'static str> {
        match self {
            Self::Directory => None,
            Self::Mbtiles => Some("tiles.mbtiles"),
            Self::Repo => Some("tiles.repo"),
        }
    }
}

impl FromStr for OutputType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "directory" | "dir" => Ok(Self::Directory),
            "mbtiles" => Ok(Self::Mbtiles),
            "repo" => Ok(Self::Repo),
            other => Err(ConfigError::UnknownOutputType(other.to_string())),
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a job's tiles go.
///
/// `output_path` is `<output_root>/<output_dir>`. For the directory variant
/// `file_name` is a per-tile pattern below it; for the container variants it
/// names the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLocation {
    output_path: PathBuf,
    output_dir: String,
    file_name: String,
}

impl OutputLocation {
    /// Builds the location, replacing a placeholder pattern with the default
    /// container name for the mbtiles and repo variants.
    pub fn new(
        output_root: &Path,
        output_dir: &str,
        file_name: &str,
        output_type: OutputType,
    ) -> Self {
        let mut file_name = file_name.to_string();
        if let Some(container) = output_type.default_container_name() {
            if has_tile_placeholders(&file_name) {
                warn!(
                    output_type = %output_type,
                    pattern = %file_name,
                    replacement = container,
                    "Output file contains placeholders but the output type needs a static name"
                );
                file_name = container.to_string();
            }
        }

        Self {
            output_path: output_root.join(output_dir),
            output_dir: output_dir.to_string(),
            file_name,
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn output_dir(&self) -> &str {
        &self.output_dir
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// `output_path` joined with the (unresolved) file name.
    pub fn full_path(&self) -> PathBuf {
        self.output_path.join(&self.file_name)
    }

    /// Path of `tile` with the file pattern resolved.
    pub fn target_for(&self, tile: &TileCoord) -> PathBuf {
        self.output_path.join(substitute(&self.file_name, tile))
    }
}

/// Opens the backend for `output_type` at `location`.
pub fn create_backend(
    output_type: OutputType,
    location: &OutputLocation,
) -> Result<Arc<dyn OutputBackend>, OutputError> {
    let backend: Arc<dyn OutputBackend> = match output_type {
        OutputType::Directory => Arc::new(DirectoryBackend::new()),
        OutputType::Mbtiles => Arc::new(MbtilesBackend::open(&location.full_path())?),
        OutputType::Repo => Arc::new(RepoBackend::new(location.full_path())),
    };
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_type_parse() {
        assert_eq!("directory".parse::<OutputType>().unwrap(), OutputType::Directory);
        assert_eq!("MBTiles".parse::<OutputType>().unwrap(), OutputType::Mbtiles);
        assert_eq!("repo".parse::<OutputType>().unwrap(), OutputType::Repo);
        assert!(matches!(
            "zip".parse::<OutputType>(),
            Err(ConfigError::UnknownOutputType(_))
        ));
    }

    #[test]
    fn test_directory_location_resolves_pattern() {
        let location = OutputLocation::new(
            Path::new("output"),
            "osm",
            "{z}/{x}/{y}.png",
            OutputType::Directory,
        );
        assert_eq!(
            location.target_for(&TileCoord::new(3, 5, 4)),
            Path::new("output/osm/4/3/5.png")
        );
        assert_eq!(location.output_path(), Path::new("output/osm"));
    }

    #[test]
    fn test_quadkey_pattern() {
        let location = OutputLocation::new(
            Path::new("out"),
            "bing",
            "{quad}.jpg",
            OutputType::Directory,
        );
        assert_eq!(
            location.target_for(&TileCoord::new(3, 5, 3)),
            Path::new("out/bing/213.jpg")
        );
    }

    #[test]
    fn test_container_pattern_replaced() {
        let mbtiles = OutputLocation::new(
            Path::new("output"),
            "job",
            "{z}/{x}/{y}.png",
            OutputType::Mbtiles,
        );
        assert_eq!(mbtiles.file_name(), "tiles.mbtiles");
        assert_eq!(mbtiles.full_path(), Path::new("output/job/tiles.mbtiles"));

        let repo = OutputLocation::new(Path::new("output"), "job", "{quad}", OutputType::Repo);
        assert_eq!(repo.file_name(), "tiles.repo");

        let named =
            OutputLocation::new(Path::new("output"), "job", "city.mbtiles", OutputType::Mbtiles);
        assert_eq!(named.file_name(), "city.mbtiles");
    }

    #[test]
    fn test_create_backend_variants() {
        let dir = tempfile::TempDir::new().unwrap();
        for (output_type, name) in [
            (OutputType::Directory, "directory"),
            (OutputType::Mbtiles, "mbtiles"),
            (OutputType::Repo, "repo"),
        ] {
            let location =
                OutputLocation::new(dir.path(), "job", "{z}/{x}/{y}.png", output_type);
            let backend = create_backend(output_type, &location).unwrap();
            assert_eq!(backend.name(), name);
        }
    }
}
