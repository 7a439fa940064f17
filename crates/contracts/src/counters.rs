//! Rolling counters for one run.

use serde::{Deserialize, Serialize};

use crate::Outcome;

/// Per-run outcome counters.
///
/// Non-decreasing within a run; `total_sent` always equals the sum of the four
/// outcome counters once a result has been folded in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateCounters {
    pub total_sent: u64,
    pub success: u64,
    pub failed: u64,
    pub rate_limited: u64,
    pub sent_unconfirmed: u64,
}

impl AggregateCounters {
    /// Count one result: `total_sent` plus exactly one outcome bucket
    pub fn increment(&mut self, outcome: Outcome) {
        self.total_sent += 1;
        match outcome {
            Outcome::Success => self.success += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::RateLimited => self.rate_limited += 1,
            Outcome::SentUnconfirmed => self.sent_unconfirmed += 1,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    /// `total_sent == success + failed + rate_limited + sent_unconfirmed`
    pub fn is_consistent(&self) -> bool {
        self.total_sent == self.success + self.failed + self.rate_limited + self.sent_unconfirmed
    }

    /// Success rate as a percentage of `total_sent`
    pub fn success_rate(&self) -> f64 {
        if self.total_sent == 0 {
            0.0
        } else {
            self.success as f64 / self.total_sent as f64 * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_one_bucket() {
        let mut counters = AggregateCounters::default();
        counters.increment(Outcome::RateLimited);
        counters.increment(Outcome::SentUnconfirmed);
        assert_eq!(counters.total_sent, 2);
        assert_eq!(counters.rate_limited, 1);
        assert_eq!(counters.sent_unconfirmed, 1);
        assert_eq!(counters.success, 0);
        assert!(counters.is_consistent());
    }

    #[test]
    fn test_success_rate() {
        let mut counters = AggregateCounters::default();
        assert_eq!(counters.success_rate(), 0.0);
        counters.increment(Outcome::Success);
        counters.increment(Outcome::Failed);
        assert!((counters.success_rate() - 50.0).abs() < f64::EPSILON);
    }
}
