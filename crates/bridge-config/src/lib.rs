//! # Bridge Config
//!
//! Environment-driven configuration for the translation bridge.
//!
//! The configuration is read once at startup into a [`BridgeConfig`] and
//! passed down explicitly; nothing reads the environment after startup.
//! A missing API key for a backend that requires one is fatal. Missing
//! cache settings merely disable caching.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;

use bridge_core::BridgeError;
use secrecy::SecretString;

/// Default listening port
pub const DEFAULT_PORT: u16 = 8000;
/// Default backend request timeout in seconds
pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 60;
/// Default cache entry lifetime (24 hours)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 86_400;
/// Default semantic-match similarity threshold
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.8;

/// Top-level bridge configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Generation backend settings
    pub backend: BackendConfig,
    /// Response cache settings
    pub cache: CacheConfig,
    /// Tool execution settings
    pub tools: ToolsConfig,
}

/// HTTP server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Listening port
    pub port: u16,
}

/// Generation backend settings
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the OpenAI-style API (e.g. `http://localhost:11434/v1`)
    pub base_url: String,
    /// Model sent to the backend regardless of what the client asked for
    pub model: String,
    /// Model name echoed back to the client
    pub display_model: String,
    /// API key, when the backend needs one
    pub api_key: Option<SecretString>,
    /// Whether a missing API key is fatal (cloud backends)
    pub api_key_required: bool,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

/// Response cache settings
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether caching is active at all
    pub enabled: bool,
    /// Entry lifetime in seconds
    pub ttl_secs: u64,
    /// Enable the semantic (similarity) lookup path
    pub semantic: bool,
    /// Cosine similarity threshold for a semantic hit
    pub similarity_threshold: f32,
}

/// Tool execution settings
#[derive(Debug, Clone)]
pub struct ToolsConfig {
    /// Whether the tool pass runs on responses
    pub enabled: bool,
    /// Root directory all file operations must stay within
    pub root: PathBuf,
}

impl BridgeConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    /// Returns a config error when a required value is malformed or a
    /// required API key is absent.
    pub fn from_env() -> Result<Self, BridgeError> {
        let config = Self {
            server: ServerConfig {
                host: env_or("BRIDGE_HOST", "0.0.0.0"),
                port: parse_env("BRIDGE_PORT", DEFAULT_PORT)?,
            },
            backend: BackendConfig {
                base_url: env_or("BACKEND_BASE_URL", "http://localhost:11434/v1"),
                model: env_or("BACKEND_MODEL", "qwen2.5-coder:7b"),
                display_model: env_or("BRIDGE_DISPLAY_MODEL", "claude-3-sonnet-20240229"),
                api_key: std::env::var("BACKEND_API_KEY").ok().map(SecretString::new),
                api_key_required: parse_env("BACKEND_API_KEY_REQUIRED", false)?,
                timeout_secs: parse_env("BACKEND_TIMEOUT_SECS", DEFAULT_BACKEND_TIMEOUT_SECS)?,
            },
            cache: CacheConfig {
                enabled: parse_env("CACHE_ENABLED", false)?,
                ttl_secs: parse_env("CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?,
                semantic: parse_env("CACHE_SEMANTIC", false)?,
                similarity_threshold: parse_env(
                    "CACHE_SIMILARITY_THRESHOLD",
                    DEFAULT_SIMILARITY_THRESHOLD,
                )?,
            },
            tools: ToolsConfig {
                enabled: parse_env("TOOLS_ENABLED", false)?,
                root: std::env::var("TOOLS_ROOT")
                    .map_or_else(|_| PathBuf::from("."), PathBuf::from),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints.
    ///
    /// # Errors
    /// Returns a config error when the backend requires an API key but
    /// none is set, or when the similarity threshold is out of range.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.backend.api_key_required && self.backend.api_key.is_none() {
            return Err(BridgeError::config(
                "BACKEND_API_KEY is required for this backend but is not set",
            ));
        }

        if !(0.0..=1.0).contains(&self.cache.similarity_threshold) {
            return Err(BridgeError::config(format!(
                "CACHE_SIMILARITY_THRESHOLD must be between 0.0 and 1.0, got {}",
                self.cache.similarity_threshold
            )));
        }

        if self.backend.base_url.trim().is_empty() {
            return Err(BridgeError::config("BACKEND_BASE_URL cannot be empty"));
        }

        Ok(())
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: DEFAULT_PORT,
            },
            backend: BackendConfig {
                base_url: "http://localhost:11434/v1".to_string(),
                model: "qwen2.5-coder:7b".to_string(),
                display_model: "claude-3-sonnet-20240229".to_string(),
                api_key: None,
                api_key_required: false,
                timeout_secs: DEFAULT_BACKEND_TIMEOUT_SECS,
            },
            cache: CacheConfig {
                enabled: false,
                ttl_secs: DEFAULT_CACHE_TTL_SECS,
                semantic: false,
                similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            },
            tools: ToolsConfig {
                enabled: false,
                root: PathBuf::from("."),
            },
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T, BridgeError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| BridgeError::config(format!("invalid value for {key}: {e}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = BridgeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.cache.ttl_secs, 86_400);
        assert!((config.cache.similarity_threshold - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn test_missing_required_api_key_is_fatal() {
        let mut config = BridgeConfig::default();
        config.backend.api_key_required = true;
        config.backend.api_key = None;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("BACKEND_API_KEY"));
    }

    #[test]
    fn test_api_key_present_satisfies_requirement() {
        let mut config = BridgeConfig::default();
        config.backend.api_key_required = true;
        config.backend.api_key = Some(SecretString::new("sk-test".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_similarity_threshold_range() {
        let mut config = BridgeConfig::default();
        config.cache.similarity_threshold = 1.5;
        assert!(config.validate().is_err());
    }
}
