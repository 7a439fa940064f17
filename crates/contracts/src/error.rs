//! Layered error definitions
//!
//! `ContractError` covers everything that may halt startup (config / catalog / parameters).
//! `DispatchFailure` covers failures that are recovered locally as a `DispatchResult`.

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// A template references a runtime parameter that was not supplied
    #[error("missing parameter '{parameter}' for target '{target}'")]
    MissingParameter { target: String, parameter: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create missing parameter error
    pub fn missing_parameter(target: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self::MissingParameter {
            target: target.into(),
            parameter: parameter.into(),
        }
    }
}

/// Failure classes that never escape the transport boundary.
///
/// Each one is folded into a `DispatchResult` with `Outcome::Failed` (or
/// `RateLimited` for a 429 upstream). The `Display` text becomes the result message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchFailure {
    /// Deadline exceeded before a response was read
    #[error("timeout")]
    Timeout,

    /// DNS / connect / TLS / body read failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Remote answered with a non-2xx status
    #[error("upstream returned {status}")]
    Upstream { status: u16 },

    /// Breaker rejected the call before any network I/O
    #[error("circuit open")]
    CircuitOpen,

    /// Payload could not be built (should have been caught at start)
    #[error("configuration error: {0}")]
    Configuration(String),
}
