//! CLI runner for common setup.
//!
//! Loads the configuration file and initializes logging, so command handlers
//! start from a ready environment.

use crate::error::CliError;
use std::path::{Path, PathBuf};
use tilefetch::config::{ConfigFile, ConfigFileError};
use tilefetch::logging::{init_logging, LoggingGuard};
use tracing::info;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
}

impl CliRunner {
    /// Loads the configuration and initializes logging.
    ///
    /// `config_path` replaces the default `~/.tilefetch/config.ini` and must
    /// exist. `verbose` and `log_file` override the file's `[logging]`
    /// section.
    pub fn new(
        config_path: Option<&Path>,
        verbose: bool,
        log_file: Option<&Path>,
    ) -> Result<Self, CliError> {
        let config = load_config(config_path)?;

        let verbose = verbose || config.logging.verbose;
        let log_file: Option<PathBuf> = log_file
            .map(Path::to_path_buf)
            .or_else(|| config.logging.file.clone());

        let logging_guard = init_logging(verbose, log_file.as_deref())
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("tilefetch v{}", tilefetch::VERSION);
        info!("tilefetch CLI: {} command", command);
    }
}

fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    match path {
        Some(path) if !path.exists() => Err(CliError::ConfigFile(ConfigFileError::InvalidValue {
            section: "cli".to_string(),
            key: "config".to_string(),
            value: path.display().to_string(),
            reason: "file does not exist".to_string(),
        })),
        Some(path) => Ok(ConfigFile::load_from(path)?),
        None => Ok(ConfigFile::load()?),
    }
}
