//! FallbackPolicy - ordered payload candidates under one deadline

use std::time::Duration;

use contracts::{DispatchFailure, DispatchResult, HttpCall, Transport};
use tokio::time::Instant;
use tracing::{debug, instrument};

/// Tries candidates in order until one is accepted (Success / RateLimited /
/// SentUnconfirmed) or the list or the shared budget runs out.
///
/// The returned result is always that of the last attempt actually made, with
/// `attempt` set to its candidate index.
#[derive(Debug, Clone, Copy)]
pub struct FallbackPolicy {
    budget: Duration,
}

impl FallbackPolicy {
    /// `budget` covers all attempts together, it is not reset per attempt
    pub fn new(budget: Duration) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Run `calls` (index offset `first_attempt`) through `transport`
    #[instrument(name = "fallback_run", skip(self, transport, calls), fields(candidates = calls.len()))]
    pub async fn run<T>(&self, transport: &T, calls: &[HttpCall], first_attempt: u32) -> DispatchResult
    where
        T: Transport + Sync,
    {
        let started = Instant::now();
        let deadline = started + self.budget;
        let mut last: Option<DispatchResult> = None;

        for (offset, call) in calls.iter().enumerate() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!(attempt = offset, "Fallback budget exhausted");
                break;
            }

            let attempt = first_attempt + offset as u32;
            let result = transport.send(call, remaining).await.with_attempt(attempt);
            let accepted = result.outcome.is_terminal();
            debug!(attempt, outcome = %result.outcome, "Fallback attempt finished");
            last = Some(result);
            if accepted {
                break;
            }
        }

        last.unwrap_or_else(|| {
            let failure = if calls.is_empty() {
                DispatchFailure::Configuration("no payload candidates".into())
            } else {
                DispatchFailure::Timeout
            };
            DispatchResult::failed(failure, started.elapsed().as_millis() as u64)
                .with_attempt(first_attempt)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::{HttpMethod, Outcome, ResponseMode};
    use parking_lot::Mutex;
    use std::collections::{BTreeMap, VecDeque};
    use tokio::time::sleep;

    /// Replays a script of (latency, status) pairs and records the budgets it saw
    struct ScriptedTransport {
        script: Mutex<VecDeque<(u64, u16)>>,
        seen_timeouts: Mutex<Vec<Duration>>,
    }

    impl ScriptedTransport {
        fn new(script: &[(u64, u16)]) -> Self {
            Self {
                script: Mutex::new(script.iter().copied().collect()),
                seen_timeouts: Mutex::new(Vec::new()),
            }
        }
    }

    impl Transport for ScriptedTransport {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn send(&self, call: &HttpCall, timeout: Duration) -> DispatchResult {
            self.seen_timeouts.lock().push(timeout);
            let step = self.script.lock().pop_front();
            let (latency, status) = step.unwrap_or((0, 500));
            let latency = Duration::from_millis(latency);
            if latency > timeout {
                sleep(timeout).await;
                return DispatchResult::failed(DispatchFailure::Timeout, timeout.as_millis() as u64);
            }
            sleep(latency).await;
            crate::classify::result_for_status(status, None, "", latency.as_millis() as u64, call.response_mode)
        }
    }

    fn calls(n: usize) -> Vec<HttpCall> {
        calls_with_mode(n, ResponseMode::Observed)
    }

    fn calls_with_mode(n: usize, response_mode: ResponseMode) -> Vec<HttpCall> {
        (0..n)
            .map(|i| HttpCall {
                url: format!("https://t.example.com/{i}"),
                method: HttpMethod::Post,
                headers: BTreeMap::new(),
                body: Bytes::new(),
                response_mode,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_at_first_success() {
        let transport = ScriptedTransport::new(&[(10, 400), (10, 200), (10, 200)]);
        let policy = FallbackPolicy::new(Duration::from_secs(1));
        let result = policy.run(&transport, &calls(3), 0).await;
        assert_eq!(result.outcome, Outcome::Success);
        assert_eq!(result.attempt, 1);
        assert_eq!(transport.seen_timeouts.lock().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_stops_iteration() {
        let transport = ScriptedTransport::new(&[(10, 429), (10, 200)]);
        let policy = FallbackPolicy::new(Duration::from_secs(1));
        let result = policy.run(&transport, &calls(2), 0).await;
        assert_eq!(result.outcome, Outcome::RateLimited);
        assert_eq!(result.attempt, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_opaque_exchange_is_not_resent() {
        let transport = ScriptedTransport::new(&[(10, 400), (10, 200)]);
        let policy = FallbackPolicy::new(Duration::from_secs(1));
        let result = policy
            .run(&transport, &calls_with_mode(2, ResponseMode::Opaque), 0)
            .await;
        assert_eq!(result.outcome, Outcome::SentUnconfirmed);
        assert_eq!(result.attempt, 0);
        assert_eq!(transport.seen_timeouts.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_list_returns_last_attempt() {
        let transport = ScriptedTransport::new(&[(10, 400), (10, 404), (10, 500)]);
        let policy = FallbackPolicy::new(Duration::from_secs(1));
        let result = policy.run(&transport, &calls(3), 0).await;
        assert_eq!(result.outcome, Outcome::Failed);
        assert_eq!(result.http_status, Some(500));
        assert_eq!(result.attempt, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_is_shared_across_attempts() {
        let transport = ScriptedTransport::new(&[(300, 400), (300, 400), (300, 200)]);
        let policy = FallbackPolicy::new(Duration::from_millis(500));

        let started = Instant::now();
        let result = policy.run(&transport, &calls(3), 0).await;

        // second attempt only had 200ms left and timed out; third never ran
        assert_eq!(result.outcome, Outcome::Failed);
        assert_eq!(result.message, "timeout");
        assert_eq!(result.attempt, 1);
        assert_eq!(started.elapsed(), Duration::from_millis(500));

        let seen = transport.seen_timeouts.lock().clone();
        assert_eq!(seen, vec![Duration::from_millis(500), Duration::from_millis(200)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_offset() {
        let transport = ScriptedTransport::new(&[(1, 200)]);
        let policy = FallbackPolicy::new(Duration::from_secs(1));
        let result = policy.run(&transport, &calls(1), 2).await;
        assert_eq!(result.attempt, 2);
    }

    #[tokio::test]
    async fn test_empty_candidates() {
        let transport = ScriptedTransport::new(&[]);
        let policy = FallbackPolicy::new(Duration::from_secs(1));
        let result = policy.run(&transport, &[], 0).await;
        assert_eq!(result.outcome, Outcome::Failed);
        assert!(result.message.contains("no payload candidates"));
    }
}
