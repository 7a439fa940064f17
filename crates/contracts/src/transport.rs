//! Transport trait - outbound call interface
//!
//! Performs exactly one HTTP call and normalizes whatever happens into a
//! `DispatchResult`. The scheduler relies on transports never failing.

use std::time::Duration;

use crate::{DispatchResult, HttpCall};

/// Outbound call trait
///
/// All transport implementations must implement this trait.
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    /// Transport name (used for logging)
    fn name(&self) -> &str;

    /// Send one call, bounded by `timeout`.
    ///
    /// Timeouts, connection errors and non-2xx answers all come back as a
    /// `DispatchResult` with the matching outcome; this never panics or errors.
    async fn send(&self, call: &HttpCall, timeout: Duration) -> DispatchResult;
}
