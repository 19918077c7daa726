//! Event timestamp source.
//!
//! Timestamps are the wall-clock time captured once at startup plus the
//! monotonic time elapsed since, so they never go backwards within a
//! process even if the system clock is adjusted.

use std::sync::OnceLock;
use std::time::Instant;

use chrono::Utc;

/// Monotonic clock anchored to a wall-clock origin.
#[derive(Debug, Clone, Copy)]
pub struct EventClock {
    origin_ms: f64,
    started: Instant,
}

static GLOBAL_CLOCK: OnceLock<EventClock> = OnceLock::new();

impl EventClock {
    /// A clock anchored at the current wall-clock time.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            origin_ms: now.timestamp_micros() as f64 / 1000.0,
            started: Instant::now(),
        }
    }

    /// The process-wide clock, anchored on first use.
    pub fn global() -> &'static EventClock {
        GLOBAL_CLOCK.get_or_init(EventClock::new)
    }

    /// Current time in fractional epoch milliseconds.
    pub fn now_ms(&self) -> f64 {
        self.origin_ms + self.started.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for EventClock {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
