//! checkspool Pipeline Framework
//!
//! Common abstractions for pipelines that write measurement points to a
//! time-series sink.
//!
//! # Overview
//!
//! This framework provides:
//! - [`PipelineConfig`] trait for configuration loading and validation
//! - [`Runner`] for managing process lifecycle (startup, shutdown, signal handling)
//! - [`Sink`] and the InfluxDB implementation [`InfluxSink`]
//! - [`line_protocol`] encoding of points
//! - [`PipelineArgs`] for common CLI argument parsing
//!
//! # Example
//!
//! ```ignore
//! use checkspool_framework::{InfluxSink, PipelineArgs, PipelineConfig, Runner};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = PipelineArgs::parse_with_default("sender.json5");
//!     let config = MyConfig::load(&args.config)?;
//!
//!     let mut runner = Runner::new_with_args("sender", config, Some(&args))?;
//!     let sink = InfluxSink::new(runner.config().influx.clone())?;
//!
//!     runner.spawn("worker", my_worker(sink, runner.cancellation_token()));
//!
//!     // Run until Ctrl+C
//!     runner.run().await?;
//!     Ok(())
//! }
//! ```

mod args;
mod config;
mod error;
pub mod line_protocol;
mod runner;
mod sink;

pub use args::PipelineArgs;
pub use config::PipelineConfig;
pub use error::{FrameworkError, Result, SinkError};
pub use runner::Runner;
pub use sink::{InfluxConfig, InfluxSink, Sink};

pub use tokio_util::sync::CancellationToken;

// Re-export commonly used types from checkspool-common
pub use checkspool_common::{Batch, FieldValue, LogFormat, LoggingConfig, MeasurementPoint};
