//! EmulatedTransport - deterministic local emulator
//!
//! No network I/O. Every call draws a latency and a status from a seeded RNG,
//! then sleeps for that latency, so timeouts and concurrency behave as with a
//! real endpoint while the outcome sequence stays reproducible.

use std::time::Duration;

use contracts::{DispatchFailure, DispatchResult, EmulationConfig, HttpCall, Transport};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::sleep;
use tracing::{instrument, trace};

use crate::classify::result_for_status;

/// Emulated response drawn for one call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Draw {
    latency_ms: u64,
    status: u16,
}

/// Seeded, network-free transport
#[derive(Debug)]
pub struct EmulatedTransport {
    name: String,
    config: EmulationConfig,
    rng: Mutex<StdRng>,
}

impl EmulatedTransport {
    pub fn new(name: impl Into<String>, config: EmulationConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            name: name.into(),
            config,
            rng: Mutex::new(rng),
        }
    }

    fn draw(&self) -> Draw {
        let mut rng = self.rng.lock();
        let (lo, hi) = (
            self.config.min_latency_ms.min(self.config.max_latency_ms),
            self.config.max_latency_ms.max(self.config.min_latency_ms),
        );
        let latency_ms = rng.random_range(lo..=hi);
        let roll: f64 = rng.random();
        let status = if roll < self.config.failure_rate {
            500
        } else if roll < self.config.failure_rate + self.config.rate_limit_rate {
            429
        } else {
            200
        };
        Draw { latency_ms, status }
    }
}

impl Transport for EmulatedTransport {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "emulated_transport_send", skip(self, call), fields(url = %call.url))]
    async fn send(&self, call: &HttpCall, timeout: Duration) -> DispatchResult {
        let draw = self.draw();
        let latency = Duration::from_millis(draw.latency_ms);

        if latency > timeout {
            sleep(timeout).await;
            return DispatchResult::failed(DispatchFailure::Timeout, timeout.as_millis() as u64);
        }
        sleep(latency).await;

        let (reason, detail) = match draw.status {
            200 => ("OK", "emulated response, no network call"),
            429 => ("Too Many Requests", "emulated"),
            _ => ("Internal Server Error", "emulated"),
        };
        trace!(status = draw.status, latency_ms = draw.latency_ms, "Emulated call");
        result_for_status(draw.status, Some(reason), detail, draw.latency_ms, call.response_mode)
    }
}
