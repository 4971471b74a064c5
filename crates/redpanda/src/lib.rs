//! Redpanda consumer groups and address producer for the wallet enrichment engine.

pub mod config;
pub mod connection;
pub mod consumer;
pub mod health;
pub mod offsets;
pub mod producer;
pub mod session;
pub mod topics;

pub use config::*;
pub use consumer::*;
pub use offsets::*;
pub use producer::*;
pub use session::SessionWatchdog;
pub use topics::*;
