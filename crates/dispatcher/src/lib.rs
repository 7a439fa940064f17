//! # Dispatcher
//!
//! 调度模块。
//!
//! 负责：
//! - 按固定节拍驱动目标调用 (serial / concurrent)
//! - 聚合结果：计数器 + 有界活动日志
//! - 调用上限、停止与迟到结果丢弃
//! - 通过 broadcast 向订阅者推送 `DispatchEvent`

mod aggregator;
mod error;
mod executor;
mod handle;
mod scheduler;

pub use aggregator::{ActivityLog, ResultAggregator};
pub use contracts::{DispatchEvent, DispatchMode, SchedulerState, StopReason, TerminalMarker};
pub use error::DispatcherError;
pub use executor::TargetExecutor;
pub use handle::{DispatchEngine, DispatchEngineBuilder, RunParams};
pub use scheduler::EngineStatus;
