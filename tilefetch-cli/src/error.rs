//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;
use tilefetch::config::{ConfigError, ConfigFileError};
use tilefetch::dispatch::{DispatchError, JobSummary};
use tilefetch::output::OutputError;
use tilefetch::provider::ProviderError;

/// Exit code used when the user interrupts a download.
pub const EXIT_INTERRUPTED: i32 = 130;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration file could not be read or parsed
    ConfigFile(ConfigFileError),
    /// Invalid region, zoom range or download setting
    InvalidInput(ConfigError),
    /// Failed to create the HTTP client
    HttpClient(ProviderError),
    /// Failed to open the output backend
    Output(OutputError),
    /// The download job aborted
    Download(DispatchError),
    /// Interrupted by the user; carries the partial summary
    Cancelled(JobSummary),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::InvalidInput(ConfigError::InvalidBounds(_)) => {
                eprintln!();
                eprintln!("Bounds are given as min_lon,min_lat,max_lon,max_lat, for example:");
                eprintln!("  --bounds=-74.02,40.70,-73.93,40.80");
            }
            CliError::Output(OutputError::Sqlite(_)) => {
                eprintln!();
                eprintln!("Check that the output directory is writable and the file is not");
                eprintln!("open in another program.");
            }
            CliError::Cancelled(_) => process::exit(EXIT_INTERRUPTED),
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::ConfigFile(e) => write!(f, "Configuration error: {}", e),
            CliError::InvalidInput(e) => write!(f, "{}", e),
            CliError::HttpClient(e) => write!(f, "{}", e),
            CliError::Output(e) => write!(f, "Cannot open output: {}", e),
            CliError::Download(e) => write!(f, "Download failed: {}", e),
            CliError::Cancelled(summary) => write!(f, "Operation cancelled by user ({})", summary),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::InvalidInput(e) => Some(e),
            CliError::HttpClient(e) => Some(e),
            CliError::Output(e) => Some(e),
            CliError::Download(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::InvalidInput(e)
    }
}

impl From<ProviderError> for CliError {
    fn from(e: ProviderError) -> Self {
        CliError::HttpClient(e)
    }
}

impl From<OutputError> for CliError {
    fn from(e: OutputError) -> Self {
        CliError::Output(e)
    }
}

impl From<DispatchError> for CliError {
    fn from(e: DispatchError) -> Self {
        CliError::Download(e)
    }
}
