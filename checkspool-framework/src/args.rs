//! CLI argument parsing for pipelines.

use std::path::PathBuf;

use clap::Parser;

/// Common CLI arguments for all pipeline binaries.
#[derive(Parser, Debug, Clone)]
#[command(about = "checkspool spool directory sender", version)]
pub struct PipelineArgs {
    /// Path to configuration file.
    #[arg(short, long)]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

impl PipelineArgs {
    /// Parse CLI arguments with a default config path.
    ///
    /// If no `--config` argument is provided, uses the default.
    pub fn parse_with_default(default_config: &'static str) -> Self {
        Self::parse_from_with_default(std::env::args_os(), default_config)
    }

    /// Parse the given arguments with a default config path.
    ///
    /// Exits the process with a usage message on invalid input, like clap's `parse`.
    pub fn parse_from_with_default<I, T>(args: I, default_config: &'static str) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = <Self as clap::CommandFactory>::command()
            .mut_arg("config", |arg| arg.required(false).default_value(default_config))
            .get_matches_from(args);

        <Self as clap::FromArgMatches>::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
    }
}
