//! Bounded per-camera alarm log.
//!
//! This module provides the recent-events buffer behind the alarm relay:
//! - Sequence allocation (strictly increasing, never reused)
//! - Retention by count and by age, FIFO by sequence
//! - Range reads for polling and stream catch-up
//!
//! Events evicted by retention are gone for good. A viewer that reconnects
//! after a long gap sees only what is still retained.

use cam_types::{AlarmEvent, AlarmMetadata, CameraId, Sequence, Timestamp};
use std::collections::VecDeque;
use std::time::Duration;

/// How long and how many alarm events are kept per camera.
///
/// Whichever bound is tighter wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Maximum number of retained events (at least 1).
    pub max_events: usize,
    /// Maximum age of a retained event.
    pub max_age: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_events: 100,
            max_age: Duration::from_secs(600),
        }
    }
}

/// Recent alarm events for one camera.
#[derive(Debug, Clone)]
pub struct AlarmLog {
    camera_id: CameraId,
    policy: RetentionPolicy,
    events: VecDeque<AlarmEvent>,
    /// Highest sequence ever assigned, retained or not.
    last_sequence: Sequence,
}

impl AlarmLog {
    /// Create an empty log for `camera_id`.
    pub fn new(camera_id: CameraId, policy: RetentionPolicy) -> Self {
        let policy = RetentionPolicy {
            max_events: policy.max_events.max(1),
            ..policy
        };
        Self {
            camera_id,
            policy,
            events: VecDeque::new(),
            last_sequence: Sequence::zero(),
        }
    }

    /// Append a new event with the next sequence number.
    ///
    /// Applies retention before returning, so the log never exceeds
    /// `max_events`.
    pub fn append(&mut self, metadata: AlarmMetadata, at: Timestamp) -> AlarmEvent {
        self.last_sequence = self.last_sequence.next();
        let event = AlarmEvent {
            camera_id: self.camera_id.clone(),
            sequence: self.last_sequence,
            triggered_at: at,
            metadata,
        };
        self.events.push_back(event.clone());
        self.evict(at);
        event
    }

    /// Retained events with sequence greater than `after`, ascending.
    ///
    /// Expired events are evicted first. An empty result is normal and just
    /// means the caller is up to date.
    pub fn since(&mut self, after: Sequence, now: Timestamp) -> Vec<AlarmEvent> {
        self.evict(now);
        self.after(after)
    }

    /// Retained events with sequence greater than `after`, without evicting.
    pub fn after(&self, after: Sequence) -> Vec<AlarmEvent> {
        // Sequences are contiguous within the deque, so skip by offset.
        let skip = match self.events.front() {
            Some(first) if after >= first.sequence => {
                (after.value() - first.sequence.value() + 1) as usize
            }
            _ => 0,
        };
        self.events.iter().skip(skip).cloned().collect()
    }

    /// Drop events past their age limit and any excess over the count limit.
    ///
    /// Returns the number of events removed.
    pub fn evict(&mut self, now: Timestamp) -> usize {
        let before = self.events.len();
        while let Some(front) = self.events.front() {
            let too_many = self.events.len() > self.policy.max_events;
            let too_old = now.saturating_since(front.triggered_at) > self.policy.max_age;
            if too_many || too_old {
                self.events.pop_front();
            } else {
                break;
            }
        }
        before - self.events.len()
    }

    /// Highest sequence ever assigned; zero if no alarm was ever raised.
    pub fn last_sequence(&self) -> Sequence {
        self.last_sequence
    }

    /// Oldest retained sequence, if any.
    pub fn oldest_sequence(&self) -> Option<Sequence> {
        self.events.front().map(|e| e.sequence)
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True if nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The camera this log belongs to.
    pub fn camera_id(&self) -> &CameraId {
        &self.camera_id
    }
}
