//! Result aggregation: bounded activity log + running counters.

use std::fmt;

use contracts::{AggregateCounters, DispatchResult};
use ringbuf::{traits::*, HeapRb};

/// Bounded log of recent results, oldest evicted first
pub struct ActivityLog {
    entries: HeapRb<DispatchResult>,
    capacity: usize,
    evicted: u64,
}

impl fmt::Debug for ActivityLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityLog")
            .field("len", &self.entries.occupied_len())
            .field("capacity", &self.capacity)
            .field("evicted", &self.evicted)
            .finish()
    }
}

impl ActivityLog {
    /// A zero capacity is raised to one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: HeapRb::new(capacity),
            capacity,
            evicted: 0,
        }
    }

    pub fn push(&mut self, result: DispatchResult) {
        if self.entries.is_full() {
            let _ = self.entries.try_pop();
            self.evicted += 1;
        }
        let _ = self.entries.try_push(result);
    }

    pub fn len(&self) -> usize {
        self.entries.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries dropped to make room since the last clear
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Oldest -> newest
    pub fn iter(&self) -> impl Iterator<Item = &DispatchResult> {
        self.entries.iter()
    }

    pub fn snapshot(&self) -> Vec<DispatchResult> {
        self.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries = HeapRb::new(self.capacity);
        self.evicted = 0;
    }
}

/// Folds results into counters and the activity log.
///
/// Every `record` increments `total_sent` and exactly one outcome counter, so
/// `total_sent == success + failed + rate_limited + sent_unconfirmed` holds
/// after each call.
#[derive(Debug)]
pub struct ResultAggregator {
    counters: AggregateCounters,
    log: ActivityLog,
}

impl ResultAggregator {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            counters: AggregateCounters::default(),
            log: ActivityLog::new(log_capacity),
        }
    }

    /// Record one result, returning the updated counters
    pub fn record(&mut self, result: DispatchResult) -> AggregateCounters {
        self.counters.increment(result.outcome);
        self.log.push(result);
        self.counters
    }

    pub fn reset(&mut self) {
        self.counters = AggregateCounters::default();
        self.log.clear();
    }

    pub fn counters(&self) -> AggregateCounters {
        self.counters
    }

    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    /// Activity log, oldest first
    pub fn activity(&self) -> Vec<DispatchResult> {
        self.log.snapshot()
    }

    /// True when nothing has been recorded since the last reset
    pub fn is_pristine(&self) -> bool {
        self.counters.is_zero() && self.log.is_empty()
    }
}
