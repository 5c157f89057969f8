//! # Bridge Telemetry
//!
//! Logging setup for the bridge. Structured logs via `tracing` with an
//! env-filter; `RUST_LOG` overrides the configured default level.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Service name recorded in the startup log line
    pub service_name: String,
    /// Default log level when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            service_name: "llm-bridge".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Create a configuration for the given service name
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    /// Set the default log level
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}

/// Initialize the global subscriber.
///
/// # Errors
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_filter(filter))
        .try_init()
        .map_err(|e| TelemetryError::Init(e.to_string()))?;

    info!(service = %config.service_name, "Logging initialized");
    Ok(())
}

/// Telemetry initialization error
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to install the subscriber
    #[error("Failed to initialize logging: {0}")]
    Init(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = LoggingConfig::new("test-service").with_log_level("debug");
        assert_eq!(config.service_name, "test-service");
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_default_level() {
        assert_eq!(LoggingConfig::default().log_level, "info");
    }
}
