//! Application state shared across handlers.

use redpanda::AddressPublisher;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Address publisher (Redpanda in production, mock in tests)
    pub publisher: Arc<dyn AddressPublisher>,
}

impl AppState {
    pub fn new(publisher: Arc<dyn AddressPublisher>) -> Self {
        Self { publisher }
    }
}
