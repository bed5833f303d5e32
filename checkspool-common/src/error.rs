use thiserror::Error;

/// Common error type for checkspool components.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Logging error: {0}")]
    Logging(String),
}

/// Result type alias using checkspool's Error.
pub type Result<T> = std::result::Result<T, Error>;
