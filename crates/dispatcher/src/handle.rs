//! DispatchEngine - control handle over the cycle scheduler
//!
//! Cheap to clone. Every clone controls the same engine.

use std::sync::Arc;
use std::time::Duration;

use catalog::{PayloadBuilder, TargetCatalog};
use contracts::{
    AggregateCounters, DispatchEvent, DispatchMode, DispatchResult, EngineConfig, RuntimeParams,
    SchedulerState, StopReason, TerminalMarker, Transport,
};
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tracing::{info, instrument, warn};
use transport::CircuitBreaker;

use crate::aggregator::ResultAggregator;
use crate::error::DispatcherError;
use crate::executor::TargetExecutor;
use crate::scheduler::{run_loop, EngineCore, EngineStatus, RunSettings};

const DEFAULT_TICK: Duration = Duration::from_millis(500);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(8);
const DEFAULT_LOG_CAPACITY: usize = 100;
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Per-run parameters passed to [`DispatchEngine::start`]
#[derive(Debug, Clone)]
pub struct RunParams {
    pub params: RuntimeParams,
    pub mode: DispatchMode,
    pub tick_interval: Duration,
    pub call_limit: Option<u64>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            params: RuntimeParams::new(),
            mode: DispatchMode::Serial,
            tick_interval: DEFAULT_TICK,
            call_limit: None,
        }
    }
}

impl RunParams {
    /// Take mode, tick and limit from the `[engine]` section
    pub fn from_config(config: &EngineConfig, params: RuntimeParams) -> Self {
        Self {
            params,
            mode: config.mode,
            tick_interval: Duration::from_millis(config.tick_interval_ms),
            call_limit: config.call_limit,
        }
    }
}

/// Builder for creating a DispatchEngine
pub struct DispatchEngineBuilder<T> {
    catalog: TargetCatalog,
    transport: T,
    breaker: CircuitBreaker,
    request_timeout: Duration,
    log_capacity: usize,
    jitter_seed: Option<u64>,
}

impl<T> DispatchEngineBuilder<T>
where
    T: Transport + Sync + 'static,
{
    pub fn new(catalog: TargetCatalog, transport: T) -> Self {
        Self {
            catalog,
            transport,
            breaker: CircuitBreaker::new(3, Duration::from_secs(30)),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            log_capacity: DEFAULT_LOG_CAPACITY,
            jitter_seed: None,
        }
    }

    /// Apply timeout, log capacity, jitter seed and breaker settings
    pub fn with_config(self, config: &EngineConfig) -> Self {
        Self {
            breaker: CircuitBreaker::from_config(&config.circuit_breaker),
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            log_capacity: config.activity_log_capacity,
            jitter_seed: config.jitter_seed,
            ..self
        }
    }

    pub fn circuit_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn activity_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    pub fn jitter_seed(mut self, seed: u64) -> Self {
        self.jitter_seed = Some(seed);
        self
    }

    pub fn build(self) -> DispatchEngine<T> {
        let (status, _) = watch::channel(EngineStatus::default());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let executor = TargetExecutor::new(self.transport, self.breaker, self.request_timeout);

        DispatchEngine {
            core: Arc::new(EngineCore {
                catalog: Arc::new(self.catalog),
                executor: Arc::new(executor),
                aggregator: Mutex::new(ResultAggregator::new(self.log_capacity)),
                status,
                events,
                last_marker: Mutex::new(None),
                jitter_seed: self.jitter_seed,
            }),
        }
    }
}

/// Handle to a dispatch engine
pub struct DispatchEngine<T> {
    core: Arc<EngineCore<T>>,
}

impl<T> Clone for DispatchEngine<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T> DispatchEngine<T>
where
    T: Transport + Sync + 'static,
{
    pub fn builder(catalog: TargetCatalog, transport: T) -> DispatchEngineBuilder<T> {
        DispatchEngineBuilder::new(catalog, transport)
    }

    /// Begin a run from Idle or Stopped.
    ///
    /// Every catalog placeholder must have a value in `run.params`. Counters
    /// and the activity log are reset. Returns the new run generation.
    ///
    /// Must be called inside a tokio runtime.
    #[instrument(
        name = "engine_start",
        skip(self, run),
        fields(mode = ?run.mode, tick_ms = run.tick_interval.as_millis() as u64, call_limit = ?run.call_limit)
    )]
    pub fn start(&self, run: RunParams) -> Result<u64, DispatcherError> {
        if run.tick_interval.is_zero() {
            return Err(DispatcherError::invalid_run("tick interval must be positive"));
        }
        if run.call_limit == Some(0) {
            return Err(DispatcherError::invalid_run("call limit must be at least 1"));
        }
        self.check_parameters(&run.params)?;

        let generation = {
            let mut aggregator = self.core.aggregator.lock();
            let mut generation = 0;
            let mut running = 0;
            let started = self.core.status.send_if_modified(|status| {
                if status.state == SchedulerState::Running {
                    running = status.generation;
                    return false;
                }
                status.state = SchedulerState::Running;
                status.generation += 1;
                generation = status.generation;
                true
            });
            if !started {
                warn!(generation = running, "Start rejected, engine already running");
                return Err(DispatcherError::AlreadyRunning { generation: running });
            }
            if !aggregator.is_pristine() {
                aggregator.reset();
            }
            *self.core.last_marker.lock() = None;
            let _ = self.core.events.send(DispatchEvent::Started { generation });
            generation
        };

        info!(generation, targets = self.core.catalog.count(), "Run started");
        let settings = RunSettings {
            generation,
            params: Arc::new(run.params),
            mode: run.mode,
            tick: run.tick_interval,
            call_limit: run.call_limit,
        };
        tokio::spawn(run_loop(Arc::clone(&self.core), settings));
        Ok(generation)
    }

    /// Stop the active run. Returns `false` when nothing was running.
    ///
    /// In-flight requests finish in the background; their results are dropped.
    pub fn stop(&self) -> bool {
        self.core.finish(None, StopReason::Requested)
    }

    /// Reset counters and the activity log.
    ///
    /// An active run keeps its own call budget, so its limit still applies.
    pub fn clear(&self) {
        self.core.aggregator.lock().reset();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.core.events.subscribe()
    }

    pub fn state(&self) -> SchedulerState {
        self.core.status.borrow().state
    }

    pub fn generation(&self) -> u64 {
        self.core.status.borrow().generation
    }

    pub fn counters(&self) -> AggregateCounters {
        self.core.aggregator.lock().counters()
    }

    /// Activity log, oldest first
    pub fn activity(&self) -> Vec<DispatchResult> {
        self.core.aggregator.lock().activity()
    }

    pub fn catalog(&self) -> &TargetCatalog {
        &self.core.catalog
    }

    /// Watch engine status changes
    pub fn status(&self) -> watch::Receiver<EngineStatus> {
        self.core.status.subscribe()
    }

    /// Wait until no run is active; returns the marker of the last run
    pub async fn wait(&self) -> Option<TerminalMarker> {
        let mut status = self.core.status.subscribe();
        let _ = status
            .wait_for(|s| s.state != SchedulerState::Running)
            .await;
        *self.core.last_marker.lock()
    }

    /// Render every target once so a missing parameter fails fast
    fn check_parameters(&self, params: &RuntimeParams) -> Result<(), DispatcherError> {
        let builder = PayloadBuilder::new();
        for target in self.core.catalog.all() {
            builder.build_candidates(target, params)?;
        }
        Ok(())
    }
}
