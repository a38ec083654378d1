//! Download job configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::defaults::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_OUTPUT_FILE, DEFAULT_OUTPUT_ROOT, DEFAULT_RATE_LIMIT_DELAY_MS,
    DEFAULT_RETRY_DELAY_SECS, DEFAULT_TEMP_DIR, DEFAULT_TIMEOUT_SECS, DEFAULT_WORKERS,
    MAX_WORKERS,
};
use super::ConfigError;
use crate::fetch::{RetryPolicy, Scale};
use crate::output::OutputType;

/// Configuration for a tile download job.
///
/// Groups the worker pool, retry and output parameters with the defaults of
/// the original command-line tool, while allowing customization.
///
/// # Example
///
/// ```
/// use tilefetch::config::DownloadConfig;
/// use tilefetch::fetch::Scale;
///
/// // Using defaults
/// let config = DownloadConfig::default();
/// assert_eq!(config.workers(), 4);
/// assert_eq!(config.max_attempts(), 5);
///
/// // Custom configuration
/// let config = DownloadConfig::new()
///     .with_workers(8)
///     .with_max_attempts(3)
///     .with_scale(Scale::Two);
/// assert_eq!(config.workers(), 8);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadConfig {
    /// Number of tiles processed concurrently
    workers: usize,
    /// Attempts per tile, first try included
    max_attempts: u32,
    /// Per-attempt request timeout
    timeout: Duration,
    /// Delay before the second attempt
    retry_delay: Duration,
    /// Pause after each completion before more work is submitted
    rate_limit_delay: Duration,
    /// Output scale
    scale: Scale,
    /// Output backend variant
    output_type: OutputType,
    /// File pattern (directory) or file name (mbtiles/repo)
    output_file: String,
    /// Root that the job's output directory is placed under
    output_root: PathBuf,
    /// Where in-flight downloads are written
    temp_dir: PathBuf,
    /// Report successes as well as failures
    verbose: bool,
}

impl DownloadConfig {
    /// Create a new download configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker pool size.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the number of attempts per tile.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the per-attempt request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the initial retry delay. Each further retry doubles it.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the pause inserted between tile completions.
    pub fn with_rate_limit_delay(mut self, delay: Duration) -> Self {
        self.rate_limit_delay = delay;
        self
    }

    /// Set the output scale.
    pub fn with_scale(mut self, scale: Scale) -> Self {
        self.scale = scale;
        self
    }

    /// Set the output backend variant.
    pub fn with_output_type(mut self, output_type: OutputType) -> Self {
        self.output_type = output_type;
        self
    }

    /// Set the output file pattern or container file name.
    pub fn with_output_file(mut self, output_file: impl Into<String>) -> Self {
        self.output_file = output_file.into();
        self
    }

    /// Set the root directory for outputs.
    pub fn with_output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = root.into();
        self
    }

    /// Set the temp directory for in-flight downloads.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    /// Enable or disable success reporting.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    pub fn rate_limit_delay(&self) -> Duration {
        self.rate_limit_delay
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn output_type(&self) -> OutputType {
        self.output_type
    }

    pub fn output_file(&self) -> &str {
        &self.output_file
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Retry policy derived from the attempt, timeout and delay settings.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.timeout, self.retry_delay)
    }

    /// Checks the values that would otherwise fail mid-job.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkers(self.workers));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        Ok(())
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
            rate_limit_delay: Duration::from_millis(DEFAULT_RATE_LIMIT_DELAY_MS),
            scale: Scale::One,
            output_type: OutputType::Directory,
            output_file: DEFAULT_OUTPUT_FILE.to_string(),
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            temp_dir: PathBuf::from(DEFAULT_TEMP_DIR),
            verbose: false,
        }
    }
}
