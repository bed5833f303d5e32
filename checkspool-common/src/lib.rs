//! checkspool Common Library
//!
//! This crate provides shared types and utilities for the checkspool pipeline:
//!
//! - [`point`] - Measurement data model (`MeasurementPoint`, `FieldValue`, `Batch`)
//! - [`config`] - Logging settings
//! - [`error`] - Error types

pub mod config;
pub mod error;
pub mod point;

use std::fs::OpenOptions;
use std::sync::Mutex;

// Re-export commonly used types at the crate root
pub use config::{LogFormat, LoggingConfig};
pub use error::{Error, Result};
pub use point::{Batch, FieldValue, METRIC_MEASUREMENT, MeasurementPoint, STATE_MEASUREMENT};

/// Initialize tracing with the given configuration.
///
/// Supports two output formats:
/// - `LogFormat::Text` (default): Human-readable text format
/// - `LogFormat::Json`: Structured JSON format for log aggregation systems
///
/// Output goes to stdout unless `config.file` is set, in which case the
/// file is opened in append mode (and created if missing).
///
/// # Example
///
/// ```ignore
/// use checkspool_common::{LoggingConfig, LogFormat, init_tracing};
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     format: LogFormat::Json,
///     file: None,
/// };
/// init_tracing(&config)?;
/// ```
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::fmt::writer::BoxMakeWriter;
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (writer, ansi) = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    Error::Logging(format!(
                        "Failed to open log file '{}': {}",
                        path.display(),
                        e
                    ))
                })?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stdout), true),
    };

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(ansi))
                .with(filter)
                .try_init()
                .map_err(|e| Error::Logging(format!("Failed to initialize tracing: {}", e)))?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json().with_writer(writer))
                .with(filter)
                .try_init()
                .map_err(|e| Error::Logging(format!("Failed to initialize tracing: {}", e)))?;
        }
    }

    if let Some(path) = &config.file {
        tracing::info!(file = %path.display(), "Writing logs to file");
    }

    Ok(())
}
