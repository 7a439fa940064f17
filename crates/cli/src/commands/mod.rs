//! Command implementations.

mod info;
mod run;
mod serve;
mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use contracts::EngineBlueprint;

use crate::error::CliError;

pub use info::run_info;
pub use run::run_dispatch;
pub use serve::run_serve;
pub use validate::run_validate;

/// Load and validate a configuration file
pub(crate) fn load_blueprint(path: &Path) -> Result<EngineBlueprint> {
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()).into());
    }
    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

/// Register the global shutdown future (Ctrl+C / SIGTERM)
pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
