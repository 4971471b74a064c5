//! Enrichment pipeline for the wallet enrichment engine.
//!
//! - Priority consumer (two-topic admission control over a consumer group)
//! - Batch processor (windows, pacing, liveness pings)
//! - Cache gate (TTL lookup cache)
//! - Bounded resolver and its sources (social profiles, ENS names)
//! - Name reconciliation (validity intervals)
//! - Scheduler (group supervision, metrics flush)

pub mod batch;
pub mod cache_gate;
pub mod config;
pub mod pipeline;
pub mod priority;
pub mod reconcile;
pub mod resolver;
pub mod scheduler;
pub mod sink;
pub mod sources;

pub use batch::{BatchProcessor, BatchReport};
pub use cache_gate::CacheGate;
pub use config::{SocialMode, SourcesConfig};
pub use priority::{PriorityConsumer, PriorityState};
pub use reconcile::{NamePlan, NameSnapshot, Reconciler};
pub use resolver::{BoundedResolver, EnrichmentSource};
pub use scheduler::*;
pub use sink::{FactSink, NameSink, WindowSink};
