//! ClickHouse storage for the wallet enrichment engine.

pub mod cache;
pub mod client;
pub mod config;
pub mod facts;
pub mod health;
pub mod metrics;
pub mod names;
pub mod offsets;
pub mod query;
pub mod schema;
pub mod store;

pub use client::*;
pub use config::*;
pub use metrics::insert_metrics;
pub use query::*;
pub use store::*;
