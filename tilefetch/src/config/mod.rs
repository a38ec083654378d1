//! Configuration types for tilefetch.
//!
//! - [`DownloadConfig`]: typed job parameters, built with `with_*` setters
//! - [`ConfigFile`]: the optional INI file at `~/.tilefetch/config.ini`
//! - [`ConfigError`]: invalid job descriptions, detected before any fetch
//!
//! # Example
//!
//! ```
//! use tilefetch::config::{ConfigFile, DownloadConfig};
//!
//! let from_file = ConfigFile::default().download_config();
//! assert_eq!(from_file, DownloadConfig::default());
//! ```

pub mod defaults;
mod download;
mod error;
mod file;

pub use defaults::{config_directory, config_file_path, num_cpus};
pub use download::DownloadConfig;
pub use error::ConfigError;
pub use file::{ConfigFile, ConfigFileError, DownloadSettings, LoggingSettings};
