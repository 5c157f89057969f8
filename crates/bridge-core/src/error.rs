//! Error types for the bridge.
//!
//! A single error taxonomy shared by every crate in the workspace. Each
//! variant carries enough context to map to an HTTP status at the edge and
//! to decide retryability inside the resilience layer.

use thiserror::Error;

/// Convenience result alias used throughout the bridge
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Unified error type for the bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Request failed validation before reaching the backend
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable description
        message: String,
        /// Field that failed validation, when known
        field: Option<String>,
    },

    /// The backend returned a non-success status
    #[error("Backend error (status {status}): {message}")]
    Backend {
        /// HTTP status returned by the backend
        status: u16,
        /// Backend-provided error body or description
        message: String,
    },

    /// The backend rejected the request with HTTP 429
    #[error("Rate limited by backend: {message}")]
    RateLimited {
        /// Backend-provided description
        message: String,
        /// Server-suggested delay before retrying, when provided
        retry_after_ms: Option<u64>,
    },

    /// Transport-level failure reaching the backend
    #[error("Connection error: {message}")]
    Connection {
        /// Underlying transport description
        message: String,
    },

    /// The backend did not respond within the deadline
    #[error("Backend timed out after {seconds}s")]
    Timeout {
        /// Deadline that elapsed
        seconds: u64,
    },

    /// A streaming response terminated abnormally
    #[error("Stream error: {message}")]
    Stream {
        /// Description of the stream failure
        message: String,
    },

    /// Cache layer failure (always treated as a miss by callers)
    #[error("Cache error: {message}")]
    Cache {
        /// Description of the cache failure
        message: String,
    },

    /// Tool execution failure
    #[error("Tool error: {message}")]
    Tool {
        /// Description of the tool failure
        message: String,
    },

    /// Invalid or missing configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem
        message: String,
    },

    /// JSON encoding or decoding failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Unexpected internal failure
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal failure
        message: String,
    },
}

impl BridgeError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>, field: Option<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field,
        }
    }

    /// Create a backend error from an upstream status and body
    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        Self::Backend {
            status,
            message: message.into(),
        }
    }

    /// Create a rate-limit error, optionally carrying the server retry hint
    pub fn rate_limited(message: impl Into<String>, retry_after_ms: Option<u64>) -> Self {
        Self::RateLimited {
            message: message.into(),
            retry_after_ms,
        }
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(seconds: u64) -> Self {
        Self::Timeout { seconds }
    }

    /// Create a stream error
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream {
            message: message.into(),
        }
    }

    /// Create a cache error
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Create a tool error
    pub fn tool(message: impl Into<String>) -> Self {
        Self::Tool {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether a retry of the same request may succeed.
    ///
    /// Rate limits, transport failures, timeouts, and 5xx backend responses
    /// are retryable. Client errors (4xx other than 429) are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Connection { .. } | Self::Timeout { .. } => true,
            Self::Backend { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Server-suggested retry delay in milliseconds, when one was provided
    #[must_use]
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_ms, .. } => *retry_after_ms,
            _ => None,
        }
    }

    /// HTTP status code this error maps to at the API edge
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::RateLimited { .. } => 429,
            Self::Backend { status, .. } => {
                if *status >= 500 {
                    502
                } else {
                    *status
                }
            }
            Self::Connection { .. } => 502,
            Self::Timeout { .. } => 504,
            _ => 500,
        }
    }
}
