use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format.
    Json,
}

/// Common logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,

    /// Append log output to this file instead of stdout.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Return a copy of this configuration with the level replaced.
    pub fn with_level(&self, level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Wrapper {
        #[serde(default)]
        logging: LoggingConfig,
    }

    #[test]
    fn test_default_logging() {
        let config: Wrapper = json5::from_str("{}").unwrap();

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_json_logging_to_file() {
        let json5 = r#"
        {
            logging: {
                level: "debug",
                format: "json",
                file: "/var/log/checkspool.log",
            },
        }
        "#;

        let config: Wrapper = json5::from_str(json5).unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(
            config.logging.file,
            Some(PathBuf::from("/var/log/checkspool.log"))
        );
    }

    #[test]
    fn test_with_level_keeps_other_fields() {
        let config = LoggingConfig {
            level: "info".to_string(),
            format: LogFormat::Json,
            file: Some(PathBuf::from("out.log")),
        };

        let overridden = config.with_level("trace");
        assert_eq!(overridden.level, "trace");
        assert_eq!(overridden.format, LogFormat::Json);
        assert_eq!(overridden.file, config.file);
    }

    #[test]
    fn test_unknown_format_rejected() {
        let result: Result<Wrapper, _> = json5::from_str(r#"{ logging: { format: "xml" } }"#);
        assert!(result.is_err());
    }
}
