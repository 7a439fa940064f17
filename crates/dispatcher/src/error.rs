//! Dispatcher error types

use thiserror::Error;

/// Errors returned by engine control operations
///
/// Individual dispatches never fail this way; they end up as `Failed` results.
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// `start` while a run is active
    #[error("engine is already running (generation {generation})")]
    AlreadyRunning { generation: u64 },

    /// Run parameters rejected before starting
    #[error("invalid run parameters: {0}")]
    InvalidRun(String),

    /// Catalog / parameter error (from contract)
    #[error(transparent)]
    Contract(#[from] contracts::ContractError),
}

impl DispatcherError {
    pub fn invalid_run(message: impl Into<String>) -> Self {
        Self::InvalidRun(message.into())
    }
}
