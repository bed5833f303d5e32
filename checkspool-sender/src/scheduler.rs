//! Directory scheduler.
//!
//! The scheduler lists the spool directory, orders its files by modification
//! time and hands them to a bounded set of file workers. Two loops drive it:
//!
//! - the outer loop drains the directory, sleeps for the process interval and
//!   starts over, until cancelled;
//! - a drain repeats scan cycles while a cycle reports that it hit the
//!   re-scan timeout, so a large backlog is re-listed instead of worked off
//!   from a stale listing.
//!
//! The timeout is checked between submissions only. A slow file can keep a
//! cycle running past it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use checkspool_framework::{CancellationToken, Sink};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::config::{FileOrder, SpoolConfig};
use crate::error::IngestError;
use crate::processor::FileProcessor;

/// A file found in the spool directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpoolFile {
    pub path: PathBuf,
    pub name: String,
    pub modified: SystemTime,
}

/// Timing and concurrency settings of the scheduler.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub source_folder: PathBuf,
    pub interval: Duration,
    pub rescan_timeout: Duration,
    pub max_workers: usize,
    pub order: FileOrder,
}

impl From<&SpoolConfig> for ScanSettings {
    fn from(config: &SpoolConfig) -> Self {
        Self {
            source_folder: config.source_folder.clone(),
            interval: config.process_interval(),
            rescan_timeout: config.reread_timeout(),
            max_workers: config.max_concurrent_workers,
            order: config.order,
        }
    }
}

/// How a scan cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Every listed file was submitted (or there was nothing to do).
    Completed,
    /// The re-scan timeout elapsed before all files were submitted.
    TimedOut,
    /// Cancellation stopped submission.
    Cancelled,
}

/// Summary of one scan cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub listed: usize,
    pub submitted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl CycleReport {
    fn empty(outcome: CycleOutcome) -> Self {
        Self {
            outcome,
            listed: 0,
            submitted: 0,
            succeeded: 0,
            failed: 0,
        }
    }
}

/// Drives file processing for one spool directory.
pub struct Scheduler<S> {
    settings: ScanSettings,
    processor: Arc<FileProcessor<S>>,
}

impl<S: Sink> Scheduler<S> {
    pub fn new(settings: ScanSettings, processor: FileProcessor<S>) -> Self {
        Self {
            settings,
            processor: Arc::new(processor),
        }
    }

    /// Run until `cancel` fires.
    ///
    /// The first drain starts immediately. Cancellation is observed between
    /// files and between cycles; files already submitted always finish.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            folder = %self.settings.source_folder.display(),
            interval_secs = self.settings.interval.as_secs_f64(),
            rescan_timeout_secs = self.settings.rescan_timeout.as_secs_f64(),
            max_workers = self.settings.max_workers,
            order = %self.settings.order,
            "Starting spool scheduler"
        );

        loop {
            self.drain(&cancel).await;

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.settings.interval) => {}
            }
        }

        tracing::info!("Spool scheduler stopped");
    }

    /// Run scan cycles until one completes without hitting the timeout.
    ///
    /// Returns the number of cycles run.
    pub async fn drain(&self, cancel: &CancellationToken) -> usize {
        let mut cycles = 0;

        while !cancel.is_cancelled() {
            cycles += 1;
            let report = self.scan_cycle(cancel).await;

            if report.outcome != CycleOutcome::TimedOut {
                break;
            }

            tracing::warn!(
                timeout_secs = self.settings.rescan_timeout.as_secs_f64(),
                remaining = report.listed - report.submitted,
                "Processing of directory took longer than timeout: re-starting"
            );
        }

        cycles
    }

    /// List, order and process the spool directory once.
    pub async fn scan_cycle(&self, cancel: &CancellationToken) -> CycleReport {
        let files = match list_files(&self.settings.source_folder, self.settings.order).await {
            Ok(files) => files,
            Err(e) => {
                tracing::error!(stage = %e.stage(), error = %e, "Could not read source folder");
                return CycleReport::empty(CycleOutcome::Completed);
            }
        };

        if files.is_empty() {
            tracing::debug!("No files to process");
            return CycleReport::empty(CycleOutcome::Completed);
        }

        tracing::trace!(files = files.len(), "Starting processing of files");

        let mut report = CycleReport::empty(CycleOutcome::Completed);
        report.listed = files.len();

        let start = Instant::now();
        let permits = Arc::new(Semaphore::new(self.settings.max_workers));
        let mut workers = JoinSet::new();

        for file in files {
            if start.elapsed() > self.settings.rescan_timeout {
                report.outcome = CycleOutcome::TimedOut;
                break;
            }

            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    report.outcome = CycleOutcome::Cancelled;
                    break;
                }
                permit = permits.clone().acquire_owned() => permit,
            };

            // The semaphore is never closed while this loop runs.
            let Ok(permit) = permit else {
                break;
            };

            let processor = self.processor.clone();
            workers.spawn(async move {
                let _permit = permit;
                processor.handle(&file.path).await
            });
            report.submitted += 1;
        }

        while let Some(result) = workers.join_next().await {
            match result {
                Ok(true) => report.succeeded += 1,
                Ok(false) => report.failed += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(error = %e, "File worker panicked");
                }
            }
        }

        tracing::debug!(
            listed = report.listed,
            submitted = report.submitted,
            succeeded = report.succeeded,
            failed = report.failed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            outcome = ?report.outcome,
            "Scan cycle finished"
        );

        report
    }
}

/// List the regular files of a directory in pickup order.
///
/// Subdirectories are skipped. Entries that vanish or cannot be inspected
/// between listing and stat are skipped with a warning.
pub async fn list_files(dir: &std::path::Path, order: FileOrder) -> Result<Vec<SpoolFile>, IngestError> {
    let unavailable = |source| IngestError::DirectoryUnavailable {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(unavailable)?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(unavailable)? {
        let name = entry.file_name().to_string_lossy().into_owned();

        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(file = %name, error = %e, "Could not read info of file");
                continue;
            }
        };

        if metadata.is_dir() {
            continue;
        }

        let modified = match metadata.modified() {
            Ok(modified) => modified,
            Err(e) => {
                tracing::warn!(file = %name, error = %e, "Could not read modification time of file");
                continue;
            }
        };

        files.push(SpoolFile {
            path: entry.path(),
            name,
            modified,
        });
    }

    sort_files(&mut files, order);
    Ok(files)
}

/// Sort by modification time, ties broken by name.
pub fn sort_files(files: &mut [SpoolFile], order: FileOrder) {
    match order {
        FileOrder::OldestFirst => {
            files.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.name.cmp(&b.name)))
        }
        FileOrder::NewestFirst => {
            files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)))
        }
    }
}
