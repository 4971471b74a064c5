//! Consumer session liveness.
//!
//! Mirrors the broker-side session timeout: if nothing extends the session
//! for `timeout`, the session is expired and progress made since the last
//! commit must not be committed.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct SessionWatchdog {
    timeout: Duration,
    last_beat: Mutex<Instant>,
}

impl SessionWatchdog {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_beat: Mutex::new(Instant::now()),
        }
    }

    /// Extends the session.
    pub fn beat(&self) {
        *self.last_beat.lock() = Instant::now();
    }

    pub fn is_expired(&self) -> bool {
        self.last_beat.lock().elapsed() > self.timeout
    }

    /// Time left before the session expires.
    pub fn remaining(&self) -> Duration {
        self.timeout.saturating_sub(self.last_beat.lock().elapsed())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
