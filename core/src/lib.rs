//! Ambient engineering stack shared by every crate in the consensus
//! aggregation engine: logging setup, monotonic time helpers, counters, the
//! `AsyncService` task lifecycle, and process shutdown signaling.

pub mod counters;
pub mod log;
pub mod service;
pub mod shutdown;
pub mod time;

pub use counters::{Counters, CountersSnapshot};
pub use log::{init_console_logger, init_logger};
pub use service::{tick, AsyncService, AsyncServiceError, AsyncServiceFuture, TickReason};
pub use shutdown::Shutdown;
pub use time::{unix_now, Stopwatch};

/// Re-exports of the `log` facade macros, so downstream crates depend on
/// `aggregator-core` rather than pulling in `log` directly.
pub use ::log::{debug, error, info, trace, warn};
