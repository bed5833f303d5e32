//! Single spool file processing.
//!
//! A file is read, every line is parsed and encoded, the resulting batch is
//! written to the sink in one call, and only then is the file deleted. Any
//! failure leaves the file where it is so the next scan picks it up again.

use std::path::Path;
use std::sync::Arc;

use checkspool_common::Batch;
use checkspool_framework::Sink;

use crate::encoder::encode_line;
use crate::error::IngestError;
use crate::parser::parse_line;

/// Result of a successfully processed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileOutcome {
    pub lines: usize,
    pub points: usize,
}

/// Processes spool files against a shared sink.
#[derive(Debug)]
pub struct FileProcessor<S> {
    sink: Arc<S>,
    max_line_bytes: usize,
}

impl<S: Sink> FileProcessor<S> {
    pub fn new(sink: Arc<S>, max_line_bytes: usize) -> Self {
        Self {
            sink,
            max_line_bytes,
        }
    }

    /// Read, convert, send and delete one file.
    pub async fn process(&self, path: &Path) -> Result<FileOutcome, IngestError> {
        let lines = read_lines(path, self.max_line_bytes).await?;
        let batch = parse_lines(&lines)?;

        if batch.is_empty() {
            tracing::debug!(file = %path.display(), "No points in file");
        } else {
            self.sink.write(&batch).await?;
        }

        tokio::fs::remove_file(path)
            .await
            .map_err(IngestError::DeletionFailure)?;

        Ok(FileOutcome {
            lines: lines.len(),
            points: batch.len(),
        })
    }

    /// Process one file and log the outcome. Returns whether it succeeded.
    pub async fn handle(&self, path: &Path) -> bool {
        match self.process(path).await {
            Ok(outcome) => {
                tracing::debug!(
                    file = %path.display(),
                    lines = outcome.lines,
                    points = outcome.points,
                    "Successfully processed and sent metrics of file"
                );
                true
            }
            Err(e) => {
                tracing::error!(
                    file = %path.display(),
                    stage = %e.stage(),
                    error = %e,
                    "Failed to process spool file"
                );
                false
            }
        }
    }
}

/// Parse and encode all lines into one batch, stopping at the first error.
pub fn parse_lines(lines: &[String]) -> Result<Batch, IngestError> {
    let mut batch = Batch::new();

    for (i, line) in lines.iter().enumerate() {
        let points = parse_line(line)
            .and_then(encode_line)
            .map_err(|e| e.at_line(i + 1))?;
        batch.extend(points);
    }

    Ok(batch)
}

/// Read a file as lines.
///
/// Lines end at `\n` with an optional `\r` before it. Text after the last
/// newline is a line of its own, an empty remainder is not. Lines longer than
/// `max_line_bytes` fail the read instead of being cut.
pub async fn read_lines(path: &Path, max_line_bytes: usize) -> Result<Vec<String>, IngestError> {
    let content = tokio::fs::read(path).await?;
    split_lines(&content, max_line_bytes)
}

fn split_lines(content: &[u8], max_line_bytes: usize) -> Result<Vec<String>, IngestError> {
    let mut lines = Vec::new();
    let mut segments = content.split(|&b| b == b'\n').peekable();

    while let Some(segment) = segments.next() {
        if segments.peek().is_none() && segment.is_empty() {
            break;
        }

        let line = segment.strip_suffix(b"\r").unwrap_or(segment);
        if line.len() > max_line_bytes {
            return Err(IngestError::LineTooLong {
                line: lines.len() + 1,
                len: line.len(),
                limit: max_line_bytes,
            });
        }

        lines.push(String::from_utf8_lossy(line).into_owned());
    }

    Ok(lines)
}
