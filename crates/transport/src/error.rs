//! Transport construction errors
//!
//! Only building a transport can fail; sending never does.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP client could not be built (TLS backend, proxy settings, ...)
    #[error("failed to build http client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}
