//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Malformed `--param`
    #[error("Invalid parameter '{raw}': {message}")]
    InvalidParam { raw: String, message: String },

    /// `serve` without a `[forwarder]` section
    #[error("No [forwarder] section in {path}")]
    ForwarderMissing { path: String },

    /// Bad listen address
    #[error("Invalid bind address '{bind}': {message}")]
    InvalidBind { bind: String, message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn invalid_param(raw: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParam {
            raw: raw.into(),
            message: message.into(),
        }
    }

    pub fn forwarder_missing(path: impl Into<String>) -> Self {
        Self::ForwarderMissing { path: path.into() }
    }

    pub fn invalid_bind(bind: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidBind {
            bind: bind.into(),
            message: message.to_string(),
        }
    }
}
