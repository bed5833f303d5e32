//! Ingestion error taxonomy.

use std::path::PathBuf;

use checkspool_framework::SinkError;
use thiserror::Error;

/// Errors raised while turning spool files into points.
///
/// Everything except [`IngestError::DirectoryUnavailable`] is scoped to a
/// single file: it is logged and the file stays in the spool directory.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Listing the spool directory failed.
    #[error("Spool directory {path} unavailable: {source}")]
    DirectoryUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line token did not split into a key and a value.
    #[error("Could not parse token '{token}': missing '::' separator")]
    MalformedToken { token: String },

    /// The `state` field is missing or not an integer.
    #[error("Could not parse state '{value}' into integer")]
    InvalidState { value: String },

    /// The `timestamp` field is missing or not an integer.
    #[error("Could not parse timestamp '{value}' into integer")]
    InvalidTimestamp { value: String },

    /// A performance-data value is not a finite number.
    ///
    /// Only ever used to skip one metric, never to fail a file.
    #[error("Performance value '{value}' of label '{label}' is not a number")]
    MetricValueUnparseable { label: String, value: String },

    /// The file could not be read.
    #[error("Could not read file: {0}")]
    Read(#[from] std::io::Error),

    /// A line exceeds the configured length cap.
    #[error("Line {line} is {len} bytes long, limit is {limit}")]
    LineTooLong { line: usize, len: usize, limit: usize },

    /// A line failed to parse or encode.
    #[error("Line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: Box<IngestError>,
    },

    /// The sink did not accept the batch.
    #[error("Could not send points: {0}")]
    DispatchFailure(#[from] SinkError),

    /// The batch was sent but the file could not be removed.
    #[error("Could not delete file: {0}")]
    DeletionFailure(#[source] std::io::Error),
}

/// Processing stage an error belongs to, used as a log field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    List,
    Read,
    Parse,
    Dispatch,
    Delete,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::List => "list",
            Stage::Read => "read",
            Stage::Parse => "parse",
            Stage::Dispatch => "dispatch",
            Stage::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl IngestError {
    /// The stage this error was raised in.
    pub fn stage(&self) -> Stage {
        match self {
            IngestError::DirectoryUnavailable { .. } => Stage::List,
            IngestError::Read(_) | IngestError::LineTooLong { .. } => Stage::Read,
            IngestError::MalformedToken { .. }
            | IngestError::InvalidState { .. }
            | IngestError::InvalidTimestamp { .. }
            | IngestError::MetricValueUnparseable { .. }
            | IngestError::Parse { .. } => Stage::Parse,
            IngestError::DispatchFailure(_) => Stage::Dispatch,
            IngestError::DeletionFailure(_) => Stage::Delete,
        }
    }

    /// Attach a 1-based line number to a parse error.
    pub fn at_line(self, line: usize) -> Self {
        IngestError::Parse {
            line,
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through line wrappers.
    pub fn root(&self) -> &IngestError {
        match self {
            IngestError::Parse { source, .. } => source.root(),
            other => other,
        }
    }
}
