//! Core types, validation, and errors for the wallet enrichment engine.

pub mod address;
pub mod cache;
pub mod clock;
pub mod enrichment;
pub mod error;
pub mod names;

pub use address::*;
pub use cache::*;
pub use clock::*;
pub use enrichment::*;
pub use error::{Error, Result};
pub use names::*;
