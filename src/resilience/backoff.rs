//! Bounded exponential reconnect backoff.

use std::time::Duration;

/// Delay schedule for consecutive connection faults.
///
/// The first fault waits the base delay; each consecutive fault doubles the
/// previous delay until the cap, where it stays pinned. A successful attach
/// resets the schedule to the base.
#[derive(Debug)]
pub struct ReconnectBackoff {
    base: Duration,
    max: Duration,
    current: Option<Duration>,
}

impl ReconnectBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            current: None,
        }
    }

    /// Delay to wait before the next attach attempt.
    pub fn next_delay(&mut self) -> Duration {
        let next = match self.current {
            None => self.base,
            Some(previous) => previous.saturating_mul(2).min(self.max),
        };
        self.current = Some(next);
        next
    }

    /// Reset after a successful attach.
    pub fn reset(&mut self) {
        self.current = None;
    }
}
