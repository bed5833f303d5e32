//! Time-series sinks.
//!
//! A [`Sink`] accepts one batch of points per call. A call either succeeds
//! (every point accepted) or fails (nothing may be assumed persisted).

use std::future::Future;
use std::io::Write;
use std::time::Duration;

use flate2::Compression;
use flate2::write::GzEncoder;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use checkspool_common::MeasurementPoint;

use crate::error::{FrameworkError, SinkError};
use crate::line_protocol::encode_batch;

/// Destination for batches of measurement points.
///
/// Implementations are shared by all file workers, so they must be safe for
/// concurrent use. Writes must tolerate being repeated with identical points.
pub trait Sink: Send + Sync + 'static {
    /// Write one batch atomically.
    fn write(
        &self,
        points: &[MeasurementPoint],
    ) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// InfluxDB v1 connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfluxConfig {
    /// Base URL, e.g. "http://localhost:8086".
    pub url: String,

    /// Target database.
    pub database: String,

    /// Compress request bodies with gzip.
    #[serde(default)]
    pub gzip: bool,

    /// Basic auth user.
    #[serde(default)]
    pub username: Option<String>,

    /// Basic auth password.
    #[serde(default)]
    pub password: Option<String>,

    /// Retention policy (`rp` query parameter).
    #[serde(default)]
    pub retention_policy: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Accept invalid TLS certificates.
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

fn default_timeout_secs() -> u64 {
    30
}

impl InfluxConfig {
    /// Create settings for a URL and database with defaults for the rest.
    pub fn new(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
            gzip: false,
            username: None,
            password: None,
            retention_policy: None,
            timeout_secs: default_timeout_secs(),
            insecure_skip_verify: false,
        }
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<(), FrameworkError> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(FrameworkError::validation(format!(
                "influx.url must start with http:// or https://, got '{}'",
                self.url
            )));
        }
        if self.database.is_empty() {
            return Err(FrameworkError::validation("influx.database must be set"));
        }
        if self.timeout_secs == 0 {
            return Err(FrameworkError::validation(
                "influx.timeout_secs must be greater than 0",
            ));
        }
        if self.password.is_some() && self.username.is_none() {
            return Err(FrameworkError::validation(
                "influx.password requires influx.username",
            ));
        }
        Ok(())
    }
}

/// Sink writing line protocol to the InfluxDB v1 `/write` endpoint.
#[derive(Debug, Clone)]
pub struct InfluxSink {
    client: reqwest::Client,
    write_url: String,
    config: InfluxConfig,
}

impl InfluxSink {
    /// Build the HTTP client for the given settings.
    pub fn new(config: InfluxConfig) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .build()
            .map_err(|e| SinkError::Build(e.to_string()))?;

        let write_url = format!("{}/write", config.url.trim_end_matches('/'));

        tracing::info!(
            url = %write_url,
            database = %config.database,
            gzip = config.gzip,
            "InfluxDB sink ready"
        );

        Ok(Self {
            client,
            write_url,
            config,
        })
    }

    /// The full URL of the write endpoint.
    pub fn write_url(&self) -> &str {
        &self.write_url
    }

    /// Get the sink settings.
    pub fn config(&self) -> &InfluxConfig {
        &self.config
    }

    fn query(&self) -> Vec<(&'static str, &str)> {
        let mut query = vec![("db", self.config.database.as_str()), ("precision", "s")];
        if let Some(rp) = &self.config.retention_policy {
            query.push(("rp", rp.as_str()));
        }
        query
    }

    fn encode_body(&self, lines: String) -> Result<Vec<u8>, SinkError> {
        if !self.config.gzip {
            return Ok(lines.into_bytes());
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(lines.as_bytes())
            .map_err(|e| SinkError::Encode(e.to_string()))?;
        encoder.finish().map_err(|e| SinkError::Encode(e.to_string()))
    }
}

impl Sink for InfluxSink {
    async fn write(&self, points: &[MeasurementPoint]) -> Result<(), SinkError> {
        if points.is_empty() {
            return Ok(());
        }

        let body = self.encode_body(encode_batch(points))?;
        let body_len = body.len();

        let mut request = self
            .client
            .post(&self.write_url)
            .query(&self.query())
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body);

        if self.config.gzip {
            request = request.header(CONTENT_ENCODING, "gzip");
        }
        if let Some(username) = &self.config.username {
            request = request.basic_auth(username, self.config.password.as_ref());
        }

        let response = request.send().await.map_err(|e| SinkError::Transport {
            url: self.write_url.clone(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                url: self.write_url.clone(),
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        tracing::debug!(points = points.len(), bytes = body_len, "Batch written");
        Ok(())
    }
}
