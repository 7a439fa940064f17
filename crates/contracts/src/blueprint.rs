//! EngineBlueprint - Config Loader output
//!
//! Describes a complete run: scheduling policy, transport, default runtime
//! parameters, the target catalog and the optional forwarding entry point.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{DispatchMode, HostAllowlist, RuntimeParams, TargetDescriptor};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EngineBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Scheduler settings
    #[serde(default)]
    #[validate(nested)]
    pub engine: EngineConfig,

    /// Transport selection
    #[serde(default)]
    #[validate(nested)]
    pub transport: TransportConfig,

    /// Default runtime parameters (CLI `--param` entries override these)
    #[serde(default)]
    pub params: RuntimeParams,

    /// Target catalog
    #[validate(length(min = 1, message = "at least one target is required"))]
    pub targets: Vec<TargetDescriptor>,

    /// Forwarding entry point (only used by `serve`)
    #[serde(default)]
    #[validate(nested)]
    pub forwarder: Option<ForwarderConfig>,
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EngineConfig {
    /// Serial or concurrent execution
    #[serde(default)]
    pub mode: DispatchMode,

    /// Tick interval in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    #[validate(range(min = 1, message = "tick_interval_ms must be > 0"))]
    pub tick_interval_ms: u64,

    /// Stop after this many recorded results (None = unlimited)
    #[serde(default)]
    #[validate(range(min = 1, message = "call_limit must be > 0"))]
    pub call_limit: Option<u64>,

    /// Per-request deadline shared by all fallback attempts
    #[serde(default = "default_request_timeout_ms")]
    #[validate(range(min = 1, message = "request_timeout_ms must be > 0"))]
    pub request_timeout_ms: u64,

    /// Bounded recent-activity log size
    #[serde(default = "default_activity_log_capacity")]
    #[validate(range(min = 1, message = "activity_log_capacity must be > 0"))]
    pub activity_log_capacity: usize,

    /// Seed for concurrent-mode jitter (None = seeded from the OS)
    #[serde(default)]
    pub jitter_seed: Option<u64>,

    /// Per-target circuit breaker
    #[serde(default)]
    #[validate(nested)]
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: DispatchMode::default(),
            tick_interval_ms: default_tick_interval_ms(),
            call_limit: None,
            request_timeout_ms: default_request_timeout_ms(),
            activity_log_capacity: default_activity_log_capacity(),
            jitter_seed: None,
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

fn default_tick_interval_ms() -> u64 {
    500
}

fn default_request_timeout_ms() -> u64 {
    8000
}

fn default_activity_log_capacity() -> usize {
    100
}

/// Circuit breaker configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CircuitBreakerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Consecutive failures that open the circuit
    #[serde(default = "default_failure_threshold")]
    #[validate(range(min = 1, message = "failure_threshold must be > 0"))]
    pub failure_threshold: u32,

    /// Time since the last failure after which an open circuit closes again
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: default_failure_threshold(),
            cooldown_ms: default_cooldown_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_cooldown_ms() -> u64 {
    30_000
}

/// Transport kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Deterministic local emulator, no network I/O
    #[default]
    Emulated,
    /// Real HTTP calls to the catalog endpoints
    Http,
}

/// Transport configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct TransportConfig {
    #[serde(default)]
    pub kind: TransportKind,

    /// Hosts the `http` transport may reach; every target must be covered
    #[serde(default)]
    pub allowed_hosts: HostAllowlist,

    /// Emulator settings (only used by `emulated`)
    #[serde(default)]
    #[validate(nested)]
    pub emulation: EmulationConfig,
}

/// Emulator configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EmulationConfig {
    /// RNG seed; identical seeds replay identical outcome sequences
    #[serde(default)]
    pub seed: u64,

    #[serde(default = "default_min_latency_ms")]
    pub min_latency_ms: u64,

    #[serde(default = "default_max_latency_ms")]
    pub max_latency_ms: u64,

    /// Probability of an emulated 500
    #[serde(default = "default_failure_rate")]
    #[validate(range(min = 0.0, max = 1.0, message = "failure_rate must be within [0, 1]"))]
    pub failure_rate: f64,

    /// Probability of an emulated 429
    #[serde(default)]
    #[validate(range(min = 0.0, max = 1.0, message = "rate_limit_rate must be within [0, 1]"))]
    pub rate_limit_rate: f64,
}

impl Default for EmulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            min_latency_ms: default_min_latency_ms(),
            max_latency_ms: default_max_latency_ms(),
            failure_rate: default_failure_rate(),
            rate_limit_rate: 0.0,
        }
    }
}

fn default_min_latency_ms() -> u64 {
    200
}

fn default_max_latency_ms() -> u64 {
    800
}

fn default_failure_rate() -> f64 {
    0.05
}

/// Forwarding entry point configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ForwarderConfig {
    /// Listen address
    #[serde(default = "default_forwarder_bind")]
    #[validate(length(min = 1, message = "bind cannot be empty"))]
    pub bind: String,

    /// Hosts requests may be forwarded to
    pub allowed_hosts: HostAllowlist,

    /// Upstream deadline
    #[serde(default = "default_request_timeout_ms")]
    #[validate(range(min = 1, message = "upstream_timeout_ms must be > 0"))]
    pub upstream_timeout_ms: u64,

    /// Accept `http://` upstreams (local testing only)
    #[serde(default)]
    pub allow_plain_http: bool,

    /// Browser origins allowed to call the forwarder. `"*"` allows any
    /// origin, an empty list turns CORS handling off.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_forwarder_bind() -> String {
    "127.0.0.1:8787".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}
