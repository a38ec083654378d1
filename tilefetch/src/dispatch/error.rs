//! Job-level errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::output::OutputError;

/// Failures that abort a whole job. Per-tile failures are reported, not
/// raised.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Cannot create temp directory {path}: {source}")]
    TempDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Writing tileset metadata failed: {0}")]
    Metadata(#[source] OutputError),

    #[error("Closing output failed: {0}")]
    Close(#[source] OutputError),
}
