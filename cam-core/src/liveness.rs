//! Liveness and staleness rules.
//!
//! A camera is `online` while `now - last_heartbeat <= timeout`. The boundary
//! is inclusive: a heartbeat exactly `timeout` ago still counts. Nothing here
//! runs on a timer; callers evaluate at read time.

use cam_types::{LiveState, Timestamp};
use std::time::Duration;

/// Liveness policy for cameras.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Liveness {
    timeout: Duration,
}

impl Liveness {
    /// Create a policy with the given heartbeat timeout.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// The heartbeat timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Evaluate the state of a camera last heard from at `last_seen`.
    ///
    /// `None` means the camera has never been seen.
    pub fn evaluate(&self, last_seen: Option<Timestamp>, now: Timestamp) -> LiveState {
        match last_seen {
            None => LiveState::Unknown,
            Some(seen) if now.saturating_since(seen) <= self.timeout => LiveState::Online,
            Some(_) => LiveState::Offline,
        }
    }
}

/// True if nothing has been received within `max_age` of `now`.
///
/// A missing timestamp is always stale.
pub fn is_stale(last: Option<Timestamp>, now: Timestamp, max_age: Duration) -> bool {
    match last {
        None => true,
        Some(t) => now.saturating_since(t) > max_age,
    }
}

/// Seconds between `last` and `now`, rounded to one decimal.
pub fn seconds_ago(last: Timestamp, now: Timestamp) -> f64 {
    let millis = now.saturating_since(last).as_millis() as f64;
    (millis / 100.0).round() / 10.0
}
