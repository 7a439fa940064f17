//! Run statistics and the end-of-run report.

use std::time::Duration;

use contracts::TerminalMarker;
use observability::DispatchMetricsAggregator;

/// Statistics from one engine run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Terminal marker of the run, if it reached one
    pub marker: Option<TerminalMarker>,

    /// Wall time from start to stop
    pub duration: Duration,

    /// Number of catalog targets
    pub targets: usize,

    /// Results dropped because the event subscriber lagged
    pub lagged: u64,

    /// Per-result metrics folded from the event stream
    pub metrics: DispatchMetricsAggregator,
}

impl RunStats {
    /// Recorded results per second
    pub fn calls_per_sec(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.total_sent() as f64 / secs
        } else {
            0.0
        }
    }

    /// Authoritative count, taken from the marker when present
    pub fn total_sent(&self) -> u64 {
        self.marker
            .map(|m| m.counters.total_sent)
            .unwrap_or_else(|| self.metrics.summary().counters.total_sent)
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                      Dispatch Statistics                     ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Targets: {}", self.targets);
        println!("   ├─ Calls/s: {:.2}", self.calls_per_sec());
        match &self.marker {
            Some(marker) => println!("   └─ Stopped: {}", marker.reason),
            None => println!("   └─ Stopped: (no terminal marker)"),
        }
        if self.lagged > 0 {
            println!("\n⚠️  {} events missed by the report (subscriber lagged)", self.lagged);
        }

        println!("\n📈 Results");
        for line in self.metrics.summary().to_string().lines() {
            println!("   {line}");
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{AggregateCounters, StopReason};

    #[test]
    fn test_total_sent_prefers_marker() {
        let counters = AggregateCounters {
            total_sent: 4,
            success: 4,
            ..Default::default()
        };
        let stats = RunStats {
            marker: Some(TerminalMarker {
                reason: StopReason::CallLimitReached { limit: 4 },
                counters,
            }),
            duration: Duration::from_secs(2),
            ..Default::default()
        };
        assert_eq!(stats.total_sent(), 4);
        assert!((stats.calls_per_sec() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_duration() {
        let stats = RunStats::default();
        assert_eq!(stats.calls_per_sec(), 0.0);
        assert_eq!(stats.total_sent(), 0);
    }
}
