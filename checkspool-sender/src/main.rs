//! Spool directory sender for monitoring check results.
//!
//! Watches the spool directory and writes check states and performance data
//! to InfluxDB.

use std::sync::Arc;

use anyhow::Result;
use checkspool_framework::{InfluxSink, PipelineArgs, PipelineConfig, Runner};

use checkspool_sender::config::SenderConfig;
use checkspool_sender::processor::FileProcessor;
use checkspool_sender::scheduler::{ScanSettings, Scheduler};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = PipelineArgs::parse_with_default("checkspool.json5");

    // Load configuration using the framework's PipelineConfig trait
    let config = SenderConfig::load(&args.config).map_err(|e| anyhow::anyhow!("{}", e))?;

    let mut runner = Runner::new_with_args("checkspool-sender", config, Some(&args))
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    let spool_config = runner.config().spool.clone();
    let influx_config = runner.config().influx.clone();

    // One HTTP client shared by every file worker
    let sink = Arc::new(InfluxSink::new(influx_config).map_err(|e| anyhow::anyhow!("{}", e))?);

    tracing::info!(
        "Sending to {} (database: {}, gzip: {})",
        sink.write_url(),
        sink.config().database,
        sink.config().gzip
    );

    if !spool_config.source_folder.is_dir() {
        tracing::warn!(
            folder = %spool_config.source_folder.display(),
            "Source folder does not exist yet, will keep retrying"
        );
    }

    let processor = FileProcessor::new(sink, spool_config.max_line_bytes);
    let scheduler = Scheduler::new(ScanSettings::from(&spool_config), processor);

    let cancel = runner.cancellation_token();
    runner.spawn("scheduler", async move {
        scheduler.run(cancel).await;
    });

    // Run until Ctrl+C / SIGTERM, then let in-flight files finish
    runner.run().await.map_err(|e| anyhow::anyhow!("{}", e))
}
