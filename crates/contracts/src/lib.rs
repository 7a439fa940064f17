//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Flow
//! - `TargetDescriptor` (static catalog entry) + `RuntimeParams` -> `DispatchRequest`
//! - `Transport` turns one `HttpCall` into a normalized `DispatchResult`
//! - `AggregateCounters` fold every `DispatchResult` recorded during a run

mod allowlist;
mod blueprint;
mod counters;
mod dispatch;
mod error;
mod event;
mod target;
mod target_id;
mod transport;

pub use allowlist::HostAllowlist;
pub use blueprint::*;
pub use counters::AggregateCounters;
pub use dispatch::*;
pub use error::*;
pub use event::*;
pub use target::*;
pub use target_id::TargetId;
pub use transport::{LocalTransport, Transport};
