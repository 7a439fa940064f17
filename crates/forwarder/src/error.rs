//! Forwarder error types
//!
//! Only policy and input problems are errors. An unreachable upstream is a
//! normal `ForwardResponse` with `reachable = false`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("host '{host}' is not allowlisted")]
    NotAllowlisted { host: String },

    #[error("scheme '{scheme}' is not allowed, use https")]
    InsecureScheme { scheme: String },

    #[error("invalid url '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("invalid method '{0}'")]
    InvalidMethod(String),

    #[error("invalid header '{name}': {message}")]
    InvalidHeader { name: String, message: String },

    #[error("invalid cors origin '{origin}': {message}")]
    InvalidCorsOrigin { origin: String, message: String },

    #[error("failed to build http client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

impl ForwardError {
    pub fn invalid_url(url: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn invalid_header(name: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidHeader {
            name: name.into(),
            message: message.to_string(),
        }
    }

    /// Rejected by the forwarding policy rather than malformed
    pub fn is_policy(&self) -> bool {
        matches!(self, Self::NotAllowlisted { .. } | Self::InsecureScheme { .. })
    }
}
