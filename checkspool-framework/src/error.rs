//! Error types for the pipeline framework.

use thiserror::Error;

/// Result type alias using [`FrameworkError`].
pub type Result<T> = std::result::Result<T, FrameworkError>;

/// Errors that can occur while setting up or running a pipeline.
#[derive(Error, Debug)]
pub enum FrameworkError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file not found.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration parse error.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// Configuration validation error.
    #[error("Configuration validation failed: {0}")]
    ConfigValidation(String),

    /// Worker error.
    #[error("Worker error: {0}")]
    Worker(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameworkError {
    /// Create a configuration validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ConfigValidation(msg.into())
    }

    /// Create a worker error.
    pub fn worker(msg: impl Into<String>) -> Self {
        Self::Worker(msg.into())
    }
}

impl From<json5::Error> for FrameworkError {
    fn from(err: json5::Error) -> Self {
        Self::ConfigParse(err.to_string())
    }
}

impl From<checkspool_common::Error> for FrameworkError {
    fn from(err: checkspool_common::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Errors returned by a [`Sink`](crate::Sink).
#[derive(Error, Debug)]
pub enum SinkError {
    /// The sink client could not be built.
    #[error("Failed to build sink client: {0}")]
    Build(String),

    /// The request never produced a response.
    #[error("Transport error writing to {url}: {message}")]
    Transport { url: String, message: String },

    /// The sink answered with a non-success status.
    #[error("Write rejected by {url} with status {status}: {body}")]
    Rejected {
        url: String,
        status: u16,
        body: String,
    },

    /// The request body could not be encoded.
    #[error("Failed to encode batch: {0}")]
    Encode(String),
}
