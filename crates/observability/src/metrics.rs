//! 分发指标收集模块
//!
//! 基于 DispatchResult 记录 Prometheus 指标，并在内存中聚合运行摘要。

use std::collections::BTreeMap;

use contracts::{AggregateCounters, DispatchResult};
use metrics::{counter, histogram};

/// 记录单条分发结果
///
/// 调度器每记录一条结果调用一次。
pub fn record_dispatch_result(result: &DispatchResult) {
    counter!(
        "dispatch_engine_requests_total",
        "target" => result.target_id.to_string(),
        "outcome" => result.outcome.as_str()
    )
    .increment(1);

    histogram!(
        "dispatch_engine_latency_ms",
        "target" => result.target_id.to_string()
    )
    .record(result.latency_ms as f64);

    if let Some(kind) = result.failure {
        counter!("dispatch_engine_failures_total", "kind" => kind.as_str()).increment(1);
    }
}

/// 记录熔断器打开
pub fn record_circuit_opened(target: &str) {
    counter!("dispatch_engine_circuit_open_total", "target" => target.to_string()).increment(1);
}

/// 记录转发器请求
///
/// `status` 为上游状态码；上游不可达时为 `None`。
pub fn record_forward(status: Option<u16>) {
    let label = status.map_or_else(|| "unreachable".to_string(), |s| s.to_string());
    counter!("dispatch_engine_forward_total", "status" => label).increment(1);
}

/// 分发指标聚合器
///
/// 在内存中聚合指标，便于运行结束时输出摘要。
#[derive(Debug, Clone, Default)]
pub struct DispatchMetricsAggregator {
    /// 全局计数
    pub counters: AggregateCounters,

    /// 延迟统计 (毫秒)
    pub latency_stats: RunningStats,

    /// 各目标计数
    pub per_target: BTreeMap<String, AggregateCounters>,

    /// 各目标延迟统计
    pub per_target_latency: BTreeMap<String, RunningStats>,
}

impl DispatchMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, result: &DispatchResult) {
        self.counters.increment(result.outcome);
        self.latency_stats.push(result.latency_ms as f64);

        let key = result.target_id.to_string();
        self.per_target
            .entry(key.clone())
            .or_default()
            .increment(result.outcome);
        self.per_target_latency
            .entry(key)
            .or_default()
            .push(result.latency_ms as f64);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            counters: self.counters,
            success_rate: self.counters.success_rate(),
            latency_ms: StatsSummary::from(&self.latency_stats),
            per_target: self
                .per_target
                .iter()
                .map(|(id, counters)| {
                    let latency = self
                        .per_target_latency
                        .get(id)
                        .map(StatsSummary::from)
                        .unwrap_or_default();
                    (id.clone(), (*counters, latency))
                })
                .collect(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub counters: AggregateCounters,
    /// 成功率 (百分比)
    pub success_rate: f64,
    pub latency_ms: StatsSummary,
    pub per_target: BTreeMap<String, (AggregateCounters, StatsSummary)>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Metrics Summary ===")?;
        writeln!(f, "Total sent: {}", self.counters.total_sent)?;
        writeln!(
            f,
            "Success: {} ({:.2}%)",
            self.counters.success, self.success_rate
        )?;
        writeln!(f, "Failed: {}", self.counters.failed)?;
        writeln!(f, "Rate limited: {}", self.counters.rate_limited)?;
        writeln!(f, "Sent unconfirmed: {}", self.counters.sent_unconfirmed)?;
        writeln!(f, "Latency (ms): {}", self.latency_ms)?;

        if !self.per_target.is_empty() {
            writeln!(f, "Per target:")?;
            for (id, (counters, latency)) in &self.per_target {
                writeln!(
                    f,
                    "  {}: sent={} ok={} failed={} limited={} unconfirmed={} latency {}",
                    id,
                    counters.total_sent,
                    counters.success,
                    counters.failed,
                    counters.rate_limited,
                    counters.sent_unconfirmed,
                    latency
                )?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.1}, std={:.1} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.mean }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
