//! Engine -> subscriber events and scheduler state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{AggregateCounters, DispatchResult};

/// Cycle scheduler lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    #[default]
    Idle,
    Running,
    Stopped,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Per-tick execution policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Round-robin, one target per tick
    #[default]
    Serial,
    /// Every target per tick, each independently delayed and time-boxed
    Concurrent,
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StopReason {
    CallLimitReached { limit: u64 },
    Requested,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CallLimitReached { limit } => {
                write!(f, "call limit of {limit} reached, run terminated")
            }
            Self::Requested => f.write_str("stop requested"),
        }
    }
}

/// Final marker emitted exactly once per run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalMarker {
    pub reason: StopReason,
    pub counters: AggregateCounters,
}

/// Events delivered to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DispatchEvent {
    /// A run began (counters already reset)
    Started { generation: u64 },
    /// A result was folded into the aggregator
    Recorded {
        result: DispatchResult,
        counters: AggregateCounters,
    },
    /// The run ended
    Stopped(TerminalMarker),
}
