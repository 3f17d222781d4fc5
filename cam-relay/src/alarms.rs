//! Alarm relay: sequenced alarm events per camera.
//!
//! Each camera owns an [`AlarmLog`] (retention and sequence allocation) plus
//! a broadcast sender for live subscribers. Sequence allocation and the
//! broadcast happen under the same lock, so subscribers see events in
//! sequence order.
//!
//! Delivery to subscribers is at-least-once within the retention window:
//! a subscriber that overflows its live buffer re-reads the retained log
//! from the last sequence it delivered.

use cam_core::{AlarmLog, RetentionPolicy};
use cam_types::{AlarmEvent, AlarmMetadata, AlarmStatus, CameraId, Sequence, Timestamp};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast::{self, error::RecvError};

#[derive(Debug)]
struct AlarmState {
    log: AlarmLog,
    active: bool,
    last_update: Timestamp,
}

/// Event log, active flag and fan-out for one camera.
#[derive(Debug)]
struct AlarmChannel {
    state: Mutex<AlarmState>,
    tx: broadcast::Sender<AlarmEvent>,
}

impl AlarmChannel {
    fn new(camera_id: CameraId, retention: RetentionPolicy, buffer: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self {
            state: Mutex::new(AlarmState {
                log: AlarmLog::new(camera_id, retention),
                active: false,
                last_update: Timestamp::default(),
            }),
            tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, AlarmState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Per-camera alarm logs with live fan-out.
#[derive(Debug)]
pub struct AlarmRelay {
    channels: DashMap<CameraId, Arc<AlarmChannel>>,
    retention: RetentionPolicy,
    stream_buffer: usize,
}

impl AlarmRelay {
    /// Create an empty alarm relay.
    pub fn new(retention: RetentionPolicy, stream_buffer: usize) -> Self {
        Self {
            channels: DashMap::new(),
            retention,
            stream_buffer,
        }
    }

    /// Append an alarm event and raise the camera's alarm flag.
    pub fn trigger(&self, camera_id: &CameraId, metadata: AlarmMetadata, at: Timestamp) -> AlarmEvent {
        let channel = self.channel(camera_id);
        let mut state = channel.lock();
        let event = state.log.append(metadata, at);
        state.active = true;
        state.last_update = state.last_update.max(at);
        // Err only means nobody is subscribed.
        let _ = channel.tx.send(event.clone());
        drop(state);

        tracing::info!("Alarm {} triggered for camera {}", event.sequence, camera_id);
        event
    }

    /// Lower the camera's alarm flag.
    ///
    /// Returns `true` if an alarm was active. Does not consume a sequence.
    pub fn clear(&self, camera_id: &CameraId, at: Timestamp) -> bool {
        let Some(channel) = self.existing(camera_id) else {
            return false;
        };
        let mut state = channel.lock();
        let was_active = state.active;
        state.active = false;
        state.last_update = state.last_update.max(at);
        drop(state);

        if was_active {
            tracing::info!("Alarm cleared for camera {}", camera_id);
        }
        was_active
    }

    /// Lower every alarm flag. Returns the cameras that were active.
    pub fn clear_all(&self, at: Timestamp) -> Vec<CameraId> {
        let channels: Vec<_> = self
            .channels
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let mut cleared: Vec<_> = channels
            .into_iter()
            .filter_map(|(camera_id, channel)| {
                let mut state = channel.lock();
                let was_active = state.active;
                state.active = false;
                state.last_update = state.last_update.max(at);
                was_active.then_some(camera_id)
            })
            .collect();
        cleared.sort();
        cleared
    }

    /// Retained events with sequence greater than `since`, ascending.
    pub fn poll(&self, camera_id: &CameraId, since: Sequence, now: Timestamp) -> Vec<AlarmEvent> {
        let Some(channel) = self.existing(camera_id) else {
            return Vec::new();
        };
        let events = channel.lock().log.since(since, now);
        events
    }

    /// Start a live alarm subscription.
    ///
    /// With `since`, retained events after that sequence are delivered first;
    /// without it, only events triggered from now on.
    pub fn subscribe(
        &self,
        camera_id: &CameraId,
        since: Option<Sequence>,
        now: Timestamp,
    ) -> AlarmSubscription {
        let channel = self.channel(camera_id);
        let mut state = channel.lock();
        let rx = channel.tx.subscribe();
        let latest = state.log.last_sequence();
        let (backlog, last_seen) = match since {
            // An id beyond anything issued here belongs to an earlier relay
            // lifetime; replay everything retained.
            Some(since) if since > latest => {
                tracing::debug!(
                    "Alarm resume point {} for camera {} is ahead of {}, replaying from start",
                    since,
                    camera_id,
                    latest
                );
                (state.log.since(Sequence::zero(), now), Sequence::zero())
            }
            Some(since) => (state.log.since(since, now), since),
            None => (Vec::new(), latest),
        };
        drop(state);

        AlarmSubscription {
            camera_id: camera_id.clone(),
            channel,
            backlog: backlog.into(),
            last_seen,
            rx,
        }
    }

    /// Highest sequence assigned for a camera, `None` if it never alarmed.
    pub fn last_sequence(&self, camera_id: &CameraId) -> Option<Sequence> {
        let channel = self.existing(camera_id)?;
        let last = channel.lock().log.last_sequence();
        (last > Sequence::zero()).then_some(last)
    }

    /// Current alarm flag, `None` if the camera never alarmed.
    pub fn status(&self, camera_id: &CameraId) -> Option<AlarmStatus> {
        let channel = self.existing(camera_id)?;
        let state = channel.lock();
        Some(AlarmStatus {
            active: state.active,
            last_update: state.last_update,
        })
    }

    /// Apply age retention to every camera. Returns the number of events removed.
    pub fn evict_expired(&self, now: Timestamp) -> usize {
        let channels: Vec<_> = self.channels.iter().map(|e| e.value().clone()).collect();
        channels
            .iter()
            .map(|channel| channel.lock().log.evict(now))
            .sum()
    }

    /// Live alarm subscribers across all cameras.
    pub fn subscriber_count(&self) -> usize {
        self.channels
            .iter()
            .map(|entry| entry.value().tx.receiver_count())
            .sum()
    }

    fn existing(&self, camera_id: &CameraId) -> Option<Arc<AlarmChannel>> {
        self.channels.get(camera_id).map(|c| c.value().clone())
    }

    fn channel(&self, camera_id: &CameraId) -> Arc<AlarmChannel> {
        if let Some(channel) = self.existing(camera_id) {
            return channel;
        }
        self.channels
            .entry(camera_id.clone())
            .or_insert_with(|| {
                Arc::new(AlarmChannel::new(
                    camera_id.clone(),
                    self.retention,
                    self.stream_buffer,
                ))
            })
            .value()
            .clone()
    }
}

/// A viewer's live alarm feed for one camera.
#[derive(Debug)]
pub struct AlarmSubscription {
    camera_id: CameraId,
    channel: Arc<AlarmChannel>,
    backlog: VecDeque<AlarmEvent>,
    last_seen: Sequence,
    rx: broadcast::Receiver<AlarmEvent>,
}

impl AlarmSubscription {
    /// Wait for the next alarm event.
    ///
    /// Events are delivered in sequence order. Returns `None` only if the
    /// camera's channel has been torn down.
    pub async fn next(&mut self) -> Option<AlarmEvent> {
        loop {
            if let Some(event) = self.backlog.pop_front() {
                if event.sequence > self.last_seen {
                    self.last_seen = event.sequence;
                    return Some(event);
                }
                continue;
            }

            match self.rx.recv().await {
                Ok(event) if event.sequence <= self.last_seen => continue,
                Ok(event) => {
                    self.last_seen = event.sequence;
                    return Some(event);
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(
                        "Alarm subscriber for camera {} lagged by {}, replaying from {}",
                        self.camera_id,
                        skipped,
                        self.last_seen
                    );
                    self.backlog = self.channel.lock().log.after(self.last_seen).into();
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Last sequence delivered (or the starting point if none yet).
    pub fn last_seen(&self) -> Sequence {
        self.last_seen
    }

    /// The camera being watched.
    pub fn camera_id(&self) -> &CameraId {
        &self.camera_id
    }
}
