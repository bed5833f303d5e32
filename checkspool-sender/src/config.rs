//! Sender configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Semaphore;

use checkspool_framework::{FrameworkError, InfluxConfig, LoggingConfig, PipelineConfig};

/// Complete sender configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderConfig {
    /// Spool directory settings.
    pub spool: SpoolConfig,

    /// InfluxDB connection settings.
    pub influx: InfluxConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Spool directory scanning configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpoolConfig {
    /// Directory the monitoring core writes check result files into.
    pub source_folder: PathBuf,

    /// Pause between two scans of the directory, in seconds.
    #[serde(default = "default_process_interval_secs")]
    pub process_interval_secs: u64,

    /// Re-list the directory when one scan runs longer than this, in seconds.
    #[serde(default = "default_reread_folder_secs")]
    pub reread_folder_secs: u64,

    /// Maximum number of files processed at the same time.
    #[serde(default = "default_max_concurrent_workers")]
    pub max_concurrent_workers: usize,

    /// Order in which files are picked up.
    #[serde(default)]
    pub order: FileOrder,

    /// Longest accepted line in bytes. Longer lines fail their file.
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

fn default_process_interval_secs() -> u64 {
    5
}

fn default_reread_folder_secs() -> u64 {
    180
}

fn default_max_concurrent_workers() -> usize {
    8
}

fn default_max_line_bytes() -> usize {
    512 * 1024
}

/// File pickup order by modification time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOrder {
    /// Oldest files first, so a steady stream of new files cannot starve old ones.
    #[default]
    OldestFirst,
    /// Newest files first, for fresher data under backlog.
    NewestFirst,
}

impl std::fmt::Display for FileOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OldestFirst => write!(f, "oldest_first"),
            Self::NewestFirst => write!(f, "newest_first"),
        }
    }
}

impl SpoolConfig {
    /// Create settings for a folder with defaults for the rest.
    pub fn new(source_folder: impl Into<PathBuf>) -> Self {
        Self {
            source_folder: source_folder.into(),
            process_interval_secs: default_process_interval_secs(),
            reread_folder_secs: default_reread_folder_secs(),
            max_concurrent_workers: default_max_concurrent_workers(),
            order: FileOrder::default(),
            max_line_bytes: default_max_line_bytes(),
        }
    }

    pub fn process_interval(&self) -> Duration {
        Duration::from_secs(self.process_interval_secs)
    }

    pub fn reread_timeout(&self) -> Duration {
        Duration::from_secs(self.reread_folder_secs)
    }
}

impl SenderConfig {
    /// Validate the configuration.
    pub fn validate_config(&self) -> Result<(), FrameworkError> {
        let spool = &self.spool;

        if spool.source_folder.as_os_str().is_empty() {
            return Err(FrameworkError::validation("spool.source_folder must be set"));
        }
        if spool.process_interval_secs == 0 {
            return Err(FrameworkError::validation(
                "spool.process_interval_secs must be greater than 0",
            ));
        }
        if spool.reread_folder_secs == 0 {
            return Err(FrameworkError::validation(
                "spool.reread_folder_secs must be greater than 0",
            ));
        }
        if spool.max_concurrent_workers == 0 {
            return Err(FrameworkError::validation(
                "spool.max_concurrent_workers must be greater than 0",
            ));
        }
        if spool.max_concurrent_workers > Semaphore::MAX_PERMITS {
            return Err(FrameworkError::validation(format!(
                "spool.max_concurrent_workers must be at most {}",
                Semaphore::MAX_PERMITS
            )));
        }
        if spool.max_line_bytes == 0 {
            return Err(FrameworkError::validation(
                "spool.max_line_bytes must be greater than 0",
            ));
        }

        self.influx.validate()
    }
}

impl PipelineConfig for SenderConfig {
    fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    fn validate(&self) -> Result<(), FrameworkError> {
        self.validate_config()
    }
}
