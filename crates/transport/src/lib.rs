//! # Transport
//!
//! Everything between a rendered call and its normalized [`DispatchResult`]:
//!
//! - [`HttpTransport`]: real outbound HTTP (reqwest) under a hard timeout
//! - [`EmulatedTransport`]: seeded local emulator, no network
//! - [`FallbackPolicy`]: ordered payload candidates sharing one deadline
//! - [`CircuitBreaker`]: per-target short-circuiting after repeated failures
//!
//! Sending never returns an error. Every failure mode is folded into a
//! `Failed` result so the scheduler loop has nothing to propagate.
//!
//! [`DispatchResult`]: contracts::DispatchResult

mod circuit_breaker;
mod classify;
mod emulated;
mod error;
mod fallback;
mod http;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use classify::{classify_status, preview, result_for_status};
pub use emulated::EmulatedTransport;
pub use error::TransportError;
pub use fallback::FallbackPolicy;
pub use http::HttpTransport;
