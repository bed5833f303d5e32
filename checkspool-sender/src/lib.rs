//! Spool directory sender for monitoring check results.
//!
//! The monitoring core drops one file per batch of check results into a
//! spool directory. Each line of a file holds the fields of one result:
//!
//! ```text
//! state::1!**!*!**!timestamp::1000000000!**!*!**!host::web01!**!*!**!perfdata::load=3.5;5;10;0;100
//! ```
//!
//! Every line becomes one `state` point plus one `metric` point per
//! performance label. All points of a file go to InfluxDB in a single write,
//! after which the file is deleted. Files that fail at any stage stay in the
//! directory and are retried on the next scan.

pub mod config;
pub mod encoder;
pub mod error;
pub mod parser;
pub mod perfdata;
pub mod processor;
pub mod scheduler;

pub use config::{FileOrder, SenderConfig, SpoolConfig};
pub use error::{IngestError, Stage};
pub use processor::{FileOutcome, FileProcessor};
pub use scheduler::{CycleOutcome, CycleReport, ScanSettings, Scheduler};
