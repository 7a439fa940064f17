//! Pipeline orchestrator - builds the engine from a blueprint and drives one run.
//!
//! The transport is picked from `[transport] kind`; the event loop is generic
//! over it.

use std::future::Future;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use catalog::TargetCatalog;
use contracts::{DispatchEvent, EngineBlueprint, Outcome, RuntimeParams, Transport, TransportKind};
use dispatcher::{DispatchEngine, RunParams};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use transport::{EmulatedTransport, HttpTransport};

use super::RunStats;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Loaded and validated configuration (CLI overrides already applied)
    pub blueprint: EngineBlueprint,

    /// Blueprint defaults merged with `--param` entries
    pub params: RuntimeParams,

    /// Run timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until the call limit, the timeout or `shutdown`
    pub async fn run<F>(self, shutdown: F) -> Result<RunStats>
    where
        F: Future<Output = ()> + Send,
    {
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let blueprint = &self.config.blueprint;
        let catalog = TargetCatalog::new(blueprint.targets.clone()).context("Failed to build target catalog")?;
        let run = RunParams::from_config(&blueprint.engine, self.config.params.clone());

        match blueprint.transport.kind {
            TransportKind::Emulated => {
                let transport = EmulatedTransport::new("emulated", blueprint.transport.emulation.clone());
                let engine = DispatchEngine::builder(catalog, transport)
                    .with_config(&blueprint.engine)
                    .build();
                run_engine(engine, run, self.config.timeout, shutdown).await
            }
            TransportKind::Http => {
                let transport = HttpTransport::new("http").context("Failed to build HTTP transport")?;
                let engine = DispatchEngine::builder(catalog, transport)
                    .with_config(&blueprint.engine)
                    .build();
                run_engine(engine, run, self.config.timeout, shutdown).await
            }
        }
    }
}

/// Start a run, log every event and stop on limit, timeout or `shutdown`
pub async fn run_engine<T, F>(
    engine: DispatchEngine<T>,
    run: RunParams,
    timeout: Option<Duration>,
    shutdown: F,
) -> Result<RunStats>
where
    T: Transport + Sync + 'static,
    F: Future<Output = ()> + Send,
{
    let mut events = engine.subscribe();
    let mut stats = RunStats {
        targets: engine.catalog().count(),
        ..Default::default()
    };

    let start_time = Instant::now();
    let generation = engine.start(run).context("Failed to start dispatch run")?;
    info!(generation, targets = stats.targets, "Dispatching");

    let deadline = async {
        match timeout {
            Some(t) => tokio::time::sleep(t).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);
    tokio::pin!(shutdown);
    let mut stopping = false;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(DispatchEvent::Started { .. }) => {}
                Ok(DispatchEvent::Recorded { result, counters }) => {
                    stats.metrics.update(&result);
                    match result.outcome {
                        Outcome::Failed => warn!(
                            target_id = %result.target_id,
                            status = ?result.http_status,
                            latency_ms = result.latency_ms,
                            detail = %result.message,
                            total_sent = counters.total_sent,
                            "Request failed"
                        ),
                        outcome => info!(
                            target_id = %result.target_id,
                            outcome = %outcome,
                            status = ?result.http_status,
                            latency_ms = result.latency_ms,
                            total_sent = counters.total_sent,
                            "Request recorded"
                        ),
                    }
                }
                Ok(DispatchEvent::Stopped(marker)) => {
                    stats.marker = Some(marker);
                    break;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event subscriber lagged");
                    stats.lagged += skipped;
                }
                Err(RecvError::Closed) => break,
            },
            _ = &mut deadline, if !stopping => {
                info!("Run timeout reached, stopping");
                stopping = true;
                engine.stop();
            }
            _ = &mut shutdown, if !stopping => {
                warn!("Received shutdown signal, stopping");
                stopping = true;
                engine.stop();
            }
        }
    }

    stats.duration = start_time.elapsed();
    if stats.marker.is_none() {
        stats.marker = engine.wait().await;
    }
    Ok(stats)
}
