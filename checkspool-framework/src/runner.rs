//! Pipeline runner for lifecycle management.

use std::future::Future;

use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use checkspool_common::init_tracing;

use crate::PipelineArgs;
use crate::config::PipelineConfig;
use crate::error::{FrameworkError, Result};

/// Runner that manages the lifecycle of a pipeline process.
///
/// Handles:
/// - Logging initialization
/// - Task spawning and management
/// - Cooperative shutdown on Ctrl+C / SIGTERM
///
/// Shutdown never aborts workers. The runner cancels its
/// [`CancellationToken`] and then waits for every spawned task to return,
/// so in-flight work (a batch being written, a file being deleted) completes.
///
/// # Example
///
/// ```ignore
/// use checkspool_framework::{PipelineArgs, PipelineConfig, Runner};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let args = PipelineArgs::parse_with_default("sender.json5");
///     let config = MyConfig::load(&args.config)?;
///
///     let mut runner = Runner::new_with_args("sender", config, Some(&args))?;
///
///     let cancel = runner.cancellation_token();
///     runner.spawn("worker", async move {
///         cancel.cancelled().await;
///     });
///
///     runner.run().await
/// }
/// ```
pub struct Runner<C: PipelineConfig> {
    /// Pipeline name for logging.
    name: String,
    /// Pipeline version.
    version: String,
    /// The loaded configuration.
    config: C,
    /// Cancelled when shutdown starts.
    cancel: CancellationToken,
    /// Spawned tasks with their names.
    tasks: Vec<(String, JoinHandle<()>)>,
}

impl<C: PipelineConfig> Runner<C> {
    /// Create a new runner with CLI args for log level override.
    pub fn new_with_args(
        name: impl Into<String>,
        config: C,
        args: Option<&PipelineArgs>,
    ) -> Result<Self> {
        let log_config = match args.and_then(|a| a.log_level.as_ref()) {
            Some(level) => config.logging().with_level(level),
            None => config.logging().clone(),
        };

        init_tracing(&log_config)?;

        let runner = Self::without_logging(name, config);
        tracing::info!(pipeline = %runner.name, version = %runner.version, "Starting pipeline");
        Ok(runner)
    }

    /// Create a runner that leaves logging setup to the caller.
    pub fn without_logging(name: impl Into<String>, config: C) -> Self {
        Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            config,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    /// Get the pipeline name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the pipeline version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &C {
        &self.config
    }

    /// Get a token that is cancelled when shutdown starts.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Spawn a worker task.
    ///
    /// The task will be awaited on shutdown. It should watch the
    /// cancellation token and return once it has finished its current work.
    pub fn spawn<F>(&mut self, name: impl Into<String>, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(future);
        self.tasks.push((name.into(), handle));
    }

    /// Run until Ctrl+C or SIGTERM is received, then drain all tasks.
    pub async fn run(self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Run until `shutdown` completes or the token is cancelled elsewhere,
    /// then drain all tasks.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(
            pipeline = %self.name,
            tasks = self.tasks.len(),
            "Pipeline running. Press Ctrl+C to stop."
        );

        tokio::select! {
            _ = shutdown => {
                tracing::info!(pipeline = %self.name, "Received shutdown signal");
            }
            _ = self.cancel.cancelled() => {
                tracing::info!(pipeline = %self.name, "Shutdown requested");
            }
        }

        self.cancel.cancel();

        let mut failed = 0usize;
        for (name, task) in self.tasks {
            if let Err(e) = task.await {
                failed += 1;
                tracing::error!(worker = %name, error = %e, "Worker did not finish cleanly");
            }
        }

        tracing::info!(pipeline = %self.name, "Goodbye!");

        if failed > 0 {
            return Err(FrameworkError::worker(format!(
                "{} worker(s) panicked or were cancelled",
                failed
            )));
        }

        Ok(())
    }
}

/// Resolve on Ctrl+C, or on SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LoggingConfig;
    use serde::Deserialize;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[derive(Debug, Deserialize)]
    struct TestConfig {
        #[serde(default)]
        logging: LoggingConfig,
    }

    impl PipelineConfig for TestConfig {
        fn logging(&self) -> &LoggingConfig {
            &self.logging
        }
    }

    fn runner() -> Runner<TestConfig> {
        Runner::without_logging(
            "test",
            TestConfig {
                logging: LoggingConfig::default(),
            },
        )
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_workers() {
        let mut runner = runner();
        let finished = Arc::new(AtomicBool::new(false));

        let cancel = runner.cancellation_token();
        let flag = finished.clone();
        runner.spawn("slow", async move {
            cancel.cancelled().await;
            // Simulate finishing an in-flight file after the stop signal.
            tokio::time::sleep(Duration::from_millis(50)).await;
            flag.store(true, Ordering::SeqCst);
        });

        runner.run_until(async {}).await.unwrap();
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_cancel_from_inside_stops_runner() {
        let mut runner = runner();
        let cancel = runner.cancellation_token();
        runner.spawn("stopper", async move {
            cancel.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            runner.run_until(std::future::pending()),
        )
        .await;
        assert!(matches!(result, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn test_panicking_worker_reported() {
        let mut runner = runner();
        runner.spawn("panics", async {
            panic!("worker panic");
        });

        let result = runner.run_until(async {}).await;
        assert!(matches!(result, Err(FrameworkError::Worker(_))));
    }
}
