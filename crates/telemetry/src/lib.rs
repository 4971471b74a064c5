//! Internal telemetry for the wallet enrichment engine.
//!
//! Counters and latency histograms live in-process and are periodically
//! flushed to ClickHouse alongside the enrichment data.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
