//! Configuration traits and utilities.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::LoggingConfig;
use crate::error::{FrameworkError, Result};

/// Trait for pipeline configuration types.
///
/// Implement this trait for a pipeline's configuration struct to get
/// automatic loading, validation, and access to the logging settings.
///
/// # Example
///
/// ```ignore
/// use serde::Deserialize;
/// use checkspool_framework::{FrameworkError, LoggingConfig, PipelineConfig};
///
/// #[derive(Debug, Deserialize)]
/// pub struct MyConfig {
///     pub logging: LoggingConfig,
///     pub folder: String,
/// }
///
/// impl PipelineConfig for MyConfig {
///     fn logging(&self) -> &LoggingConfig {
///         &self.logging
///     }
///
///     fn validate(&self) -> Result<(), FrameworkError> {
///         if self.folder.is_empty() {
///             return Err(FrameworkError::validation("folder must be set"));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait PipelineConfig: Sized + DeserializeOwned {
    /// Get the logging configuration.
    fn logging(&self) -> &LoggingConfig;

    /// Validate the configuration.
    ///
    /// Called automatically after loading. Override to add custom validation.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Parse configuration from a JSON5 string and validate it.
    fn from_json5(content: &str) -> Result<Self> {
        let config: Self = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file path.
    ///
    /// Supports JSON5 format. Calls [`validate`](Self::validate) after loading.
    fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(FrameworkError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_json5(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct TestConfig {
        #[serde(default)]
        logging: LoggingConfig,
        folder: String,
    }

    impl PipelineConfig for TestConfig {
        fn logging(&self) -> &LoggingConfig {
            &self.logging
        }

        fn validate(&self) -> Result<()> {
            if self.folder.is_empty() {
                return Err(FrameworkError::validation("folder must be set"));
            }
            Ok(())
        }
    }

    #[test]
    fn test_config_not_found() {
        let result = TestConfig::load("/nonexistent/path.json5");
        assert!(matches!(result, Err(FrameworkError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_config_unreadable() {
        let dir = std::env::temp_dir();
        let result = TestConfig::load(&dir);
        assert!(matches!(result, Err(FrameworkError::Io(_))));
    }

    #[test]
    fn test_config_parse_error() {
        let result = TestConfig::from_json5("{ folder: ");
        assert!(matches!(result, Err(FrameworkError::ConfigParse(_))));
    }

    #[test]
    fn test_config_validation_runs() {
        let result = TestConfig::from_json5(r#"{ folder: "" }"#);
        assert!(matches!(result, Err(FrameworkError::ConfigValidation(_))));

        let config = TestConfig::from_json5(r#"{ folder: "/spool" }"#).unwrap();
        assert_eq!(config.folder, "/spool");
        assert_eq!(config.logging().level, "info");
    }
}
