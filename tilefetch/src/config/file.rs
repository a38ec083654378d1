//! Configuration file handling for ~/.tilefetch/config.ini.
//!
//! The file is optional. Every key it sets overrides the built-in default;
//! command-line flags in turn override the file.
//!
//! ```ini
//! [download]
//! threads = 8
//! max_retries = 3
//! timeout = 30
//! retry_delay = 1
//! rate_limit_delay = 0.25
//! output_type = mbtiles
//! output_scale = 2
//! temp_dir = ~/.cache/tilefetch
//!
//! [logging]
//! file = ~/tilefetch.log
//! verbose = true
//! ```

use ini::Ini;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use super::defaults::{
    config_file_path, DEFAULT_MAX_ATTEMPTS, DEFAULT_OUTPUT_FILE, DEFAULT_OUTPUT_ROOT,
    DEFAULT_RATE_LIMIT_DELAY_MS, DEFAULT_RETRY_DELAY_SECS, DEFAULT_TEMP_DIR,
    DEFAULT_TIMEOUT_SECS, DEFAULT_WORKERS, MAX_WORKERS,
};
use super::DownloadConfig;
use crate::fetch::Scale;
use crate::output::OutputType;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// `[download]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadSettings {
    pub threads: usize,
    pub max_retries: u32,
    /// Per-attempt timeout in seconds
    pub timeout: u64,
    /// Initial retry delay in seconds
    pub retry_delay: u64,
    /// Delay between completions
    pub rate_limit_delay: Duration,
    pub output_type: OutputType,
    pub output_file: String,
    pub output_scale: Scale,
    pub output_root: PathBuf,
    pub temp_dir: PathBuf,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            threads: DEFAULT_WORKERS,
            max_retries: DEFAULT_MAX_ATTEMPTS,
            timeout: DEFAULT_TIMEOUT_SECS,
            retry_delay: DEFAULT_RETRY_DELAY_SECS,
            rate_limit_delay: Duration::from_millis(DEFAULT_RATE_LIMIT_DELAY_MS),
            output_type: OutputType::Directory,
            output_file: DEFAULT_OUTPUT_FILE.to_string(),
            output_scale: Scale::One,
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            temp_dir: PathBuf::from(DEFAULT_TEMP_DIR),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoggingSettings {
    /// Log file path; none means console only
    pub file: Option<PathBuf>,
    pub verbose: bool,
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub download: DownloadSettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Load configuration from the default path (~/.tilefetch/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        parse_ini(&ini)
    }

    /// Parse configuration from INI text.
    pub fn parse(content: &str) -> Result<Self, ConfigFileError> {
        let ini = Ini::load_from_str(content).map_err(ini::Error::Parse)?;
        parse_ini(&ini)
    }

    /// Build a [`DownloadConfig`] from the file's values.
    pub fn download_config(&self) -> DownloadConfig {
        let d = &self.download;
        DownloadConfig::new()
            .with_workers(d.threads)
            .with_max_attempts(d.max_retries)
            .with_timeout(Duration::from_secs(d.timeout))
            .with_retry_delay(Duration::from_secs(d.retry_delay))
            .with_rate_limit_delay(d.rate_limit_delay)
            .with_output_type(d.output_type)
            .with_output_file(d.output_file.clone())
            .with_scale(d.output_scale)
            .with_output_root(d.output_root.clone())
            .with_temp_dir(d.temp_dir.clone())
            .with_verbose(self.logging.verbose)
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: "download".to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [download] section
    if let Some(section) = ini.section(Some("download")) {
        if let Some(v) = section.get("threads") {
            let v = v.trim();
            let parsed: usize = v
                .parse()
                .map_err(|_| invalid("threads", v, "must be a positive integer"))?;
            if parsed == 0 || parsed > MAX_WORKERS {
                return Err(invalid(
                    "threads",
                    v,
                    &format!("must be between 1 and {}", MAX_WORKERS),
                ));
            }
            config.download.threads = parsed;
        }
        if let Some(v) = section.get("max_retries") {
            let v = v.trim();
            let parsed: u32 = v
                .parse()
                .map_err(|_| invalid("max_retries", v, "must be a positive integer"))?;
            if parsed == 0 {
                return Err(invalid("max_retries", v, "must be at least 1"));
            }
            config.download.max_retries = parsed;
        }
        if let Some(v) = section.get("timeout") {
            let v = v.trim();
            config.download.timeout = v
                .parse()
                .map_err(|_| invalid("timeout", v, "must be a number of seconds"))?;
        }
        if let Some(v) = section.get("retry_delay") {
            let v = v.trim();
            config.download.retry_delay = v
                .parse()
                .map_err(|_| invalid("retry_delay", v, "must be a number of seconds"))?;
        }
        if let Some(v) = section.get("rate_limit_delay") {
            let v = v.trim();
            let parsed: f64 = v
                .parse()
                .map_err(|_| invalid("rate_limit_delay", v, "must be a number of seconds"))?;
            config.download.rate_limit_delay = Duration::try_from_secs_f64(parsed)
                .map_err(|e| invalid("rate_limit_delay", v, &e.to_string()))?;
        }
        if let Some(v) = section.get("output_type") {
            let v = v.trim();
            config.download.output_type = v
                .parse()
                .map_err(|_| invalid("output_type", v, "must be directory, mbtiles or repo"))?;
        }
        if let Some(v) = section.get("output_file") {
            let v = v.trim();
            if !v.is_empty() {
                config.download.output_file = v.to_string();
            }
        }
        if let Some(v) = section.get("output_scale") {
            let v = v.trim();
            config.download.output_scale = v
                .parse::<u8>()
                .ok()
                .and_then(|s| Scale::try_from(s).ok())
                .ok_or_else(|| invalid("output_scale", v, "must be 1 or 2"))?;
        }
        if let Some(v) = section.get("output_root") {
            let v = v.trim();
            if !v.is_empty() {
                config.download.output_root = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("temp_dir") {
            let v = v.trim();
            if !v.is_empty() {
                config.download.temp_dir = expand_tilde(v);
            }
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = Some(expand_tilde(v));
            }
        }
        if let Some(v) = section.get("verbose") {
            config.logging.verbose = parse_bool(v);
        }
    }

    Ok(config)
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "yes" | "1" | "on"
    )
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
