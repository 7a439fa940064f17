//! Per-target circuit breaker
//!
//! Closed -> Open after `failure_threshold` consecutive Failed outcomes.
//! Open -> Closed once `cooldown` has elapsed since the last recorded failure.

use std::collections::HashMap;
use std::time::Duration;

use contracts::{CircuitBreakerConfig, Outcome, TargetId};
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

/// Breaker state as seen by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
}

#[derive(Debug, Default)]
struct Entry {
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    open: bool,
}

impl Entry {
    /// Close the circuit if the cooldown has run out
    fn refresh(&mut self, now: Instant, cooldown: Duration) -> bool {
        match self.last_failure {
            Some(at) if self.open && now.duration_since(at) >= cooldown => {
                self.open = false;
                self.consecutive_failures = 0;
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug)]
pub struct CircuitBreaker {
    enabled: bool,
    threshold: u32,
    cooldown: Duration,
    entries: Mutex<HashMap<TargetId, Entry>>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            enabled: true,
            threshold: threshold.max(1),
            cooldown,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &CircuitBreakerConfig) -> Self {
        Self {
            enabled: config.enabled,
            ..Self::new(config.failure_threshold, Duration::from_millis(config.cooldown_ms))
        }
    }

    /// A breaker that never opens
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(u32::MAX, Duration::ZERO)
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether a call to `target` may proceed right now
    pub fn check(&self, target: &TargetId) -> CircuitState {
        if !self.enabled {
            return CircuitState::Closed;
        }
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(target) else {
            return CircuitState::Closed;
        };
        if entry.refresh(Instant::now(), self.cooldown) {
            info!(target_id = %target, "Circuit closed after cooldown");
        }
        if entry.open {
            CircuitState::Open
        } else {
            CircuitState::Closed
        }
    }

    /// Feed a completed call back. Short-circuited calls must not be recorded.
    pub fn record(&self, target: &TargetId, outcome: Outcome) {
        if !self.enabled {
            return;
        }
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let entry = entries.entry(target.clone()).or_default();
        entry.refresh(now, self.cooldown);

        if outcome != Outcome::Failed {
            if !entry.open {
                entry.consecutive_failures = 0;
            }
            return;
        }

        entry.consecutive_failures = entry.consecutive_failures.saturating_add(1);
        entry.last_failure = Some(now);
        if !entry.open && entry.consecutive_failures >= self.threshold {
            entry.open = true;
            warn!(
                target_id = %target,
                failures = entry.consecutive_failures,
                cooldown_ms = self.cooldown.as_millis() as u64,
                "Circuit opened"
            );
            observability::record_circuit_opened(target.as_str());
        }
    }

    /// Alias of [`check`](Self::check)
    pub fn state(&self, target: &TargetId) -> CircuitState {
        self.check(target)
    }

    /// Forget all per-target history
    pub fn reset(&self) {
        self.entries.lock().clear();
    }
}
