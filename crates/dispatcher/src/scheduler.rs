//! Cycle scheduler - the run loop
//!
//! One tokio task per run owns the ticker. Serial mode awaits each request
//! inline; concurrent mode spawns one task per target and collects results over
//! an mpsc channel, so the loop stays the only writer of the aggregator.
//!
//! A result is only recorded while its run generation is current and Running.
//! Anything arriving after `stop()` or a restart is dropped.

use std::sync::Arc;
use std::time::Duration;

use catalog::TargetCatalog;
use contracts::{
    DispatchEvent, DispatchFailure, DispatchMode, DispatchRequest, DispatchResult, RuntimeParams,
    SchedulerState, StopReason, TerminalMarker, Transport,
};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::aggregator::ResultAggregator;
use crate::executor::TargetExecutor;

/// Published engine status; `generation` increases on every start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStatus {
    pub state: SchedulerState,
    pub generation: u64,
}

/// State shared by the engine handle and its run loops
pub(crate) struct EngineCore<T> {
    pub(crate) catalog: Arc<TargetCatalog>,
    pub(crate) executor: Arc<TargetExecutor<T>>,
    pub(crate) aggregator: Mutex<ResultAggregator>,
    pub(crate) status: watch::Sender<EngineStatus>,
    pub(crate) events: broadcast::Sender<DispatchEvent>,
    pub(crate) last_marker: Mutex<Option<TerminalMarker>>,
    pub(crate) jitter_seed: Option<u64>,
}

impl<T> EngineCore<T> {
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        let status = self.status.borrow();
        status.state == SchedulerState::Running && status.generation == generation
    }

    /// Fold a result into the aggregator if its run is still active.
    ///
    /// Returns `false` for a late result, which is dropped.
    pub(crate) fn record(&self, generation: u64, result: DispatchResult) -> bool {
        let mut aggregator = self.aggregator.lock();
        if !self.is_current(generation) {
            debug!(
                target_id = %result.target_id,
                generation,
                outcome = %result.outcome,
                "Dropping late result"
            );
            return false;
        }

        debug!(
            target_id = %result.target_id,
            outcome = %result.outcome,
            status = ?result.http_status,
            latency_ms = result.latency_ms,
            detail = %result.message,
            "Result recorded"
        );
        observability::record_dispatch_result(&result);
        let counters = aggregator.record(result.clone());
        let _ = self.events.send(DispatchEvent::Recorded { result, counters });
        true
    }

    /// Move Running -> Stopped and emit the terminal marker.
    ///
    /// Only the caller that performs the transition emits, so each run gets
    /// exactly one marker. `generation = None` stops whatever run is active.
    pub(crate) fn finish(&self, generation: Option<u64>, reason: StopReason) -> bool {
        let aggregator = self.aggregator.lock();
        let stopped = self.status.send_if_modified(|status| {
            let same_run = generation.is_none_or(|g| g == status.generation);
            if status.state == SchedulerState::Running && same_run {
                status.state = SchedulerState::Stopped;
                true
            } else {
                false
            }
        });
        if !stopped {
            return false;
        }

        let marker = TerminalMarker {
            reason,
            counters: aggregator.counters(),
        };
        info!(
            reason = %reason,
            total_sent = marker.counters.total_sent,
            success = marker.counters.success,
            failed = marker.counters.failed,
            "Run stopped"
        );
        *self.last_marker.lock() = Some(marker);
        let _ = self.events.send(DispatchEvent::Stopped(marker));
        true
    }
}

/// Parameters of one run
#[derive(Debug, Clone)]
pub(crate) struct RunSettings {
    pub generation: u64,
    pub params: Arc<RuntimeParams>,
    pub mode: DispatchMode,
    pub tick: Duration,
    pub call_limit: Option<u64>,
}

/// Per-run call budget.
///
/// Lives in the run loop, so `clear()` resetting the shared counters does
/// not move the limit.
#[derive(Debug, Default)]
struct Budget {
    limit: Option<u64>,
    issued: u64,
    recorded: u64,
}

impl Budget {
    fn new(limit: Option<u64>) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Requests that may still be issued
    fn remaining(&self) -> u64 {
        self.limit
            .map_or(u64::MAX, |limit| limit.saturating_sub(self.issued))
    }

    fn exhausted(&self) -> bool {
        self.limit.is_some_and(|limit| self.recorded >= limit)
    }
}

/// Record one result and stop the run once the budget is spent.
///
/// Returns `false` when the loop should exit.
fn settle<T>(
    core: &EngineCore<T>,
    generation: u64,
    budget: &mut Budget,
    result: DispatchResult,
) -> bool {
    if !core.record(generation, result) {
        return false;
    }
    budget.recorded += 1;
    match budget.limit {
        Some(limit) if budget.exhausted() => {
            core.finish(Some(generation), StopReason::CallLimitReached { limit });
            false
        }
        _ => true,
    }
}

#[instrument(
    name = "scheduler_run",
    skip(core, settings),
    fields(generation = settings.generation, mode = ?settings.mode)
)]
pub(crate) async fn run_loop<T>(core: Arc<EngineCore<T>>, settings: RunSettings)
where
    T: Transport + Sync + 'static,
{
    let mut status_rx = core.status.subscribe();
    let (result_tx, mut result_rx) = mpsc::unbounded_channel::<DispatchResult>();

    let mut ticker = interval(settings.tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut rng = match core.jitter_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let tick_ms = settings.tick.as_millis() as u64;
    let target_count = core.catalog.count();
    let mut cursor = 0usize;
    let mut budget = Budget::new(settings.call_limit);

    info!(
        targets = target_count,
        tick_ms,
        call_limit = ?settings.call_limit,
        "Scheduler started"
    );

    loop {
        tokio::select! {
            biased;

            changed = status_rx.changed() => {
                if changed.is_err() || !core.is_current(settings.generation) {
                    break;
                }
            }

            Some(result) = result_rx.recv() => {
                if !settle(&core, settings.generation, &mut budget, result) {
                    break;
                }
            }

            _ = ticker.tick() => {
                if !core.is_current(settings.generation) {
                    break;
                }
                let remaining = budget.remaining();
                if remaining == 0 {
                    // budget spent, waiting for in-flight results
                    continue;
                }

                match settings.mode {
                    DispatchMode::Serial => {
                        let Some(target) = core.catalog.at(cursor) else {
                            break;
                        };
                        cursor = (cursor + 1) % target_count;
                        budget.issued += 1;

                        let request = DispatchRequest::new(Arc::clone(target), Arc::clone(&settings.params));
                        let result = core.executor.execute(&request).await;
                        if !settle(&core, settings.generation, &mut budget, result) {
                            break;
                        }
                    }
                    DispatchMode::Concurrent => {
                        let fan_out = usize::try_from(remaining).unwrap_or(usize::MAX);
                        for target in core.catalog.all().iter().take(fan_out) {
                            let jitter = if tick_ms > 0 {
                                Duration::from_millis(rng.random_range(0..tick_ms))
                            } else {
                                Duration::ZERO
                            };
                            budget.issued += 1;

                            let request = DispatchRequest::new(Arc::clone(target), Arc::clone(&settings.params));
                            let executor = Arc::clone(&core.executor);
                            let tx = result_tx.clone();
                            tokio::spawn(async move {
                                let target = Arc::clone(&request.target);
                                let attempt = tokio::spawn(async move {
                                    sleep(jitter).await;
                                    executor.execute(&request).await
                                });
                                // a panicked request still owes the loop a result
                                let result = attempt.await.unwrap_or_else(|e| {
                                    warn!(target_id = %target.id, error = %e, "Request task failed");
                                    DispatchResult::failed(
                                        DispatchFailure::Transport(format!("request task failed: {e}")),
                                        0,
                                    )
                                    .for_target(&target)
                                });
                                // receiver is gone once the run ended
                                let _ = tx.send(result);
                            });
                        }
                    }
                }
            }
        }
    }

    debug!(issued = budget.issued, recorded = budget.recorded, "Scheduler loop exited");
}
