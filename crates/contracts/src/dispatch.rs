//! Per-call data: request, concrete HTTP call and normalized result.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DispatchFailure, HttpMethod, ResponseMode, TargetDescriptor, TargetId};

/// Runtime parameter name -> value, substituted into templates
pub type RuntimeParams = BTreeMap<String, String>;

/// One concrete attempt against one target.
///
/// Created per tick per target, discarded once its result is recorded.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub target: Arc<TargetDescriptor>,
    pub params: Arc<RuntimeParams>,
    /// Index of the first payload candidate to try
    pub attempt: u32,
}

impl DispatchRequest {
    pub fn new(target: Arc<TargetDescriptor>, params: Arc<RuntimeParams>) -> Self {
        Self {
            target,
            params,
            attempt: 0,
        }
    }
}

/// Fully rendered HTTP call handed to a `Transport`
#[derive(Debug, Clone)]
pub struct HttpCall {
    pub url: String,
    pub method: HttpMethod,
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
    pub response_mode: ResponseMode,
}

/// Normalized classification of a single request's result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failed,
    RateLimited,
    /// Sent, but the real outcome cannot be observed
    SentUnconfirmed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::RateLimited => "rate_limited",
            Self::SentUnconfirmed => "sent_unconfirmed",
        }
    }

    /// Whether the fallback policy stops on this outcome
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::RateLimited | Self::SentUnconfirmed)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse failure class carried by failed results (for logs and metrics)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    Transport,
    Upstream,
    CircuitOpen,
    Configuration,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Transport => "transport",
            Self::Upstream => "upstream",
            Self::CircuitOpen => "circuit_open",
            Self::Configuration => "configuration",
        }
    }
}

impl From<&DispatchFailure> for FailureKind {
    fn from(failure: &DispatchFailure) -> Self {
        match failure {
            DispatchFailure::Timeout => Self::Timeout,
            DispatchFailure::Transport(_) => Self::Transport,
            DispatchFailure::Upstream { .. } => Self::Upstream,
            DispatchFailure::CircuitOpen => Self::CircuitOpen,
            DispatchFailure::Configuration(_) => Self::Configuration,
        }
    }
}

/// Outcome of one `DispatchRequest`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub target_id: TargetId,
    pub target_name: String,
    pub outcome: Outcome,
    /// Upstream status, when a response was received
    pub http_status: Option<u16>,
    pub latency_ms: u64,
    pub message: String,
    /// Payload candidate index that produced this result
    pub attempt: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    pub at: DateTime<Utc>,
}

impl DispatchResult {
    /// Result for a received response
    pub fn completed(
        outcome: Outcome,
        http_status: u16,
        latency_ms: u64,
        message: impl Into<String>,
    ) -> Self {
        let failure = (outcome == Outcome::Failed).then_some(FailureKind::Upstream);
        Self {
            target_id: TargetId::default(),
            target_name: String::new(),
            outcome,
            http_status: Some(http_status),
            latency_ms,
            message: message.into(),
            attempt: 0,
            failure,
            at: Utc::now(),
        }
    }

    /// Failed result without a usable response
    pub fn failed(failure: DispatchFailure, latency_ms: u64) -> Self {
        let http_status = match &failure {
            DispatchFailure::Upstream { status } => Some(*status),
            _ => None,
        };
        Self {
            target_id: TargetId::default(),
            target_name: String::new(),
            outcome: Outcome::Failed,
            http_status,
            latency_ms,
            message: failure.to_string(),
            attempt: 0,
            failure: Some(FailureKind::from(&failure)),
            at: Utc::now(),
        }
    }

    /// Stamp target identity on a transport-level result
    pub fn for_target(mut self, target: &TargetDescriptor) -> Self {
        self.target_id = target.id.clone();
        self.target_name = target.name.clone();
        self
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }
}
