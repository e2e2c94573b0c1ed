//! Lightweight in-process metrics.
//!
//! Counters are stored as atomics and can be rendered as Prometheus text; the
//! binary logs a snapshot on exit.

pub mod metrics;

pub use metrics::{CounterVec, GatewayMetrics};
