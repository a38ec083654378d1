//! Default values and constants for all configuration settings.

use std::path::PathBuf;

// =============================================================================
// Dispatch defaults
// =============================================================================

/// Default number of tiles processed concurrently.
pub const DEFAULT_WORKERS: usize = 4;

/// Upper bound on the worker pool; tile servers rarely tolerate more.
pub const MAX_WORKERS: usize = 256;

/// Default delay between tile completions in milliseconds (0 = no rate limit).
pub const DEFAULT_RATE_LIMIT_DELAY_MS: u64 = 0;

// =============================================================================
// Retry defaults
// =============================================================================

/// Default number of attempts per tile (first try included).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default per-attempt request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default delay before the second attempt in seconds; doubles afterwards.
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 2;

// =============================================================================
// Output defaults
// =============================================================================

/// Default output scale factor.
pub const DEFAULT_OUTPUT_SCALE: u8 = 1;

/// Default file pattern inside the output directory.
pub const DEFAULT_OUTPUT_FILE: &str = "{z}/{x}/{y}.png";

/// Directory all job outputs are placed under.
pub const DEFAULT_OUTPUT_ROOT: &str = "output";

/// Directory for in-flight downloads.
pub const DEFAULT_TEMP_DIR: &str = "temp";

/// Edge length of a scale-1 tile in pixels, recorded in tileset metadata.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Image format recorded in tileset metadata.
pub const DEFAULT_TILE_FORMAT: &str = "png";

/// Projection name recorded in tileset metadata.
pub const DEFAULT_PROFILE: &str = "mercator";

/// Description recorded in tileset metadata.
pub const DEFAULT_DESCRIPTION: &str = "Tile Downloader CLI";

// =============================================================================
// Paths
// =============================================================================

/// Get the config directory path (~/.tilefetch).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tilefetch")
}

/// Get the path to the config file (~/.tilefetch/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

/// Get the number of available CPU cores.
pub fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
