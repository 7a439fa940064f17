//! `serve` command implementation.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use forwarder::Forwarder;
use tracing::info;

use super::{load_blueprint, shutdown_signal};
use crate::cli::ServeArgs;
use crate::error::CliError;

/// Execute the `serve` command
pub async fn run_serve(args: &ServeArgs) -> Result<()> {
    let blueprint = load_blueprint(&args.config)?;
    let config = blueprint
        .forwarder
        .ok_or_else(|| CliError::forwarder_missing(args.config.display().to_string()))?;

    let bind = args.bind.as_deref().unwrap_or(&config.bind);
    let addr: SocketAddr = bind
        .parse()
        .map_err(|e| CliError::invalid_bind(bind, e))?;

    let forwarder = Forwarder::new(&config).context("Failed to create forwarder")?;
    info!(
        %addr,
        allowed_hosts = ?forwarder.allowlist().entries(),
        plain_http = config.allow_plain_http,
        cors_origins = ?config.cors_origins,
        "Starting forwarder"
    );

    forwarder::serve(forwarder, addr, shutdown_signal())
        .await
        .with_context(|| format!("Forwarder failed on {addr}"))
}
