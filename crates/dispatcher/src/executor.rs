//! TargetExecutor - one DispatchRequest end to end
//!
//! breaker check -> payload candidates -> fallback policy -> transport,
//! then the outcome goes back to the breaker.

use std::time::Duration;

use catalog::PayloadBuilder;
use contracts::{DispatchFailure, DispatchRequest, DispatchResult, FailureKind, Transport};
use tracing::{debug, instrument, warn};
use transport::{CircuitBreaker, CircuitState, FallbackPolicy};

pub struct TargetExecutor<T> {
    transport: T,
    builder: PayloadBuilder,
    breaker: CircuitBreaker,
    fallback: FallbackPolicy,
}

impl<T> TargetExecutor<T>
where
    T: Transport + Sync,
{
    /// `request_timeout` bounds all payload attempts of one request together
    pub fn new(transport: T, breaker: CircuitBreaker, request_timeout: Duration) -> Self {
        Self {
            transport,
            builder: PayloadBuilder::new(),
            breaker,
            fallback: FallbackPolicy::new(request_timeout),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn request_timeout(&self) -> Duration {
        self.fallback.budget()
    }

    /// Execute one request. Never fails: every problem is a `Failed` result.
    #[instrument(
        name = "executor_execute",
        skip(self, request),
        fields(target = %request.target.id, transport = self.transport.name())
    )]
    pub async fn execute(&self, request: &DispatchRequest) -> DispatchResult {
        let target = &request.target;

        if self.breaker.check(&target.id) == CircuitState::Open {
            debug!("Short-circuited");
            return DispatchResult::failed(DispatchFailure::CircuitOpen, 0)
                .for_target(target)
                .with_attempt(request.attempt);
        }

        let calls = match self.builder.build_candidates(target, &request.params) {
            Ok(payloads) => payloads
                .into_iter()
                .skip(request.attempt as usize)
                .map(|payload| payload.into_call(target))
                .collect::<Vec<_>>(),
            Err(e) => {
                warn!(error = %e, "Payload could not be built");
                return DispatchResult::failed(DispatchFailure::Configuration(e.to_string()), 0)
                    .for_target(target)
                    .with_attempt(request.attempt);
            }
        };

        let result = self
            .fallback
            .run(&self.transport, &calls, request.attempt)
            .await
            .for_target(target);

        if result.failure != Some(FailureKind::Configuration) {
            self.breaker.record(&target.id, result.outcome);
        }
        result
    }
}
