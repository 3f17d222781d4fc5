//! Camera registry.
//!
//! Tracks every camera the relay has heard from, when it was last seen, and
//! its optional direct-stream URL. Liveness is derived lazily on read from
//! the stored heartbeat time; [`CameraRegistry::sweep`] only exists so
//! state transitions show up in the logs.

use crate::error::{RelayError, Result};
use cam_core::Liveness;
use cam_types::{CameraId, LiveState, Timestamp};
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Registry entry for one camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraRecord {
    /// Camera identifier.
    pub id: CameraId,
    /// First contact.
    pub first_seen_at: Timestamp,
    /// Latest heartbeat or other camera write. Never moves backwards.
    pub last_heartbeat_at: Timestamp,
    /// Receipt time of the latest frame push.
    pub last_frame_at: Option<Timestamp>,
    /// Direct-stream URL registered by the camera.
    pub stream_url: Option<String>,
    /// State observed by the last sweep.
    swept_state: LiveState,
}

impl CameraRecord {
    fn new(id: CameraId, at: Timestamp) -> Self {
        Self {
            id,
            first_seen_at: at,
            last_heartbeat_at: at,
            last_frame_at: None,
            stream_url: None,
            swept_state: LiveState::Online,
        }
    }

    fn touch(&mut self, at: Timestamp) {
        self.last_heartbeat_at = self.last_heartbeat_at.max(at);
    }
}

/// Cameras whose state changed since the previous sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StateChanges {
    /// Cameras that went from online to offline.
    pub went_offline: Vec<CameraId>,
    /// Cameras that came back online.
    pub came_online: Vec<CameraId>,
}

/// Known cameras, partitioned per camera.
#[derive(Debug)]
pub struct CameraRegistry {
    cameras: DashMap<CameraId, CameraRecord>,
    liveness: Liveness,
    max_cameras: usize,
    /// Slots claimed against `max_cameras`. Entries are never removed, so
    /// this only grows.
    reserved: AtomicUsize,
}

impl CameraRegistry {
    /// Create an empty registry.
    pub fn new(liveness_timeout: Duration, max_cameras: usize) -> Self {
        Self {
            cameras: DashMap::new(),
            liveness: Liveness::new(liveness_timeout),
            max_cameras,
            reserved: AtomicUsize::new(0),
        }
    }

    /// Record a heartbeat, creating the camera on first contact.
    ///
    /// Returns `true` if the camera was created by this call.
    pub fn heartbeat(&self, id: &CameraId, at: Timestamp) -> Result<bool> {
        self.upsert(id, at, |_| {})
    }

    /// Register (or refresh) a camera and set its direct-stream URL.
    ///
    /// `None` clears a previously registered URL. Counts as a heartbeat.
    pub fn register(&self, id: &CameraId, stream_url: Option<String>, at: Timestamp) -> Result<bool> {
        self.upsert(id, at, |record| record.stream_url = stream_url)
    }

    /// Admit a camera write (frame push, alarm trigger).
    ///
    /// Known cameras are refreshed. Unknown cameras are created when
    /// `auto_register` is set and rejected with `UnknownCamera` otherwise.
    pub fn admit(&self, id: &CameraId, at: Timestamp, auto_register: bool) -> Result<()> {
        if let Some(mut record) = self.cameras.get_mut(id) {
            record.touch(at);
            return Ok(());
        }
        if !auto_register {
            return Err(RelayError::UnknownCamera { camera: id.clone() });
        }
        self.upsert(id, at, |_| {}).map(|_| ())
    }

    /// Record that a frame was received from a known camera.
    pub fn record_frame(&self, id: &CameraId, at: Timestamp) {
        if let Some(mut record) = self.cameras.get_mut(id) {
            let latest = record.last_frame_at.map_or(at, |prev| prev.max(at));
            record.last_frame_at = Some(latest);
        }
    }

    /// Derived state of a camera at `now`.
    pub fn state(&self, id: &CameraId, now: Timestamp) -> LiveState {
        let last_seen = self.cameras.get(id).map(|r| r.last_heartbeat_at);
        self.liveness.evaluate(last_seen, now)
    }

    /// Fail with `UnknownCamera` unless the camera has been seen.
    pub fn require(&self, id: &CameraId) -> Result<()> {
        if self.cameras.contains_key(id) {
            Ok(())
        } else {
            Err(RelayError::UnknownCamera { camera: id.clone() })
        }
    }

    /// A copy of one camera's record.
    pub fn get(&self, id: &CameraId) -> Option<CameraRecord> {
        self.cameras.get(id).map(|r| r.clone())
    }

    /// Every known camera with its state at `now`, ordered by id.
    pub fn list(&self, now: Timestamp) -> Vec<(CameraRecord, LiveState)> {
        let mut cameras: Vec<_> = self
            .cameras
            .iter()
            .map(|entry| {
                let record = entry.value().clone();
                let state = self.liveness.evaluate(Some(record.last_heartbeat_at), now);
                (record, state)
            })
            .collect();
        cameras.sort_by(|a, b| a.0.id.cmp(&b.0.id));
        cameras
    }

    /// Re-evaluate every camera and report transitions since the last sweep.
    pub fn sweep(&self, now: Timestamp) -> StateChanges {
        let mut changes = StateChanges::default();
        for mut entry in self.cameras.iter_mut() {
            let state = self.liveness.evaluate(Some(entry.last_heartbeat_at), now);
            if state == entry.swept_state {
                continue;
            }
            match state {
                LiveState::Offline => changes.went_offline.push(entry.id.clone()),
                LiveState::Online => changes.came_online.push(entry.id.clone()),
                LiveState::Unknown => {}
            }
            entry.swept_state = state;
        }
        changes.went_offline.sort();
        changes.came_online.sort();
        changes
    }

    /// Number of known cameras.
    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    /// True if no camera has ever been seen.
    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    /// Number of cameras online at `now`.
    pub fn online_count(&self, now: Timestamp) -> usize {
        self.cameras
            .iter()
            .filter(|entry| {
                self.liveness
                    .evaluate(Some(entry.last_heartbeat_at), now)
                    .is_online()
            })
            .count()
    }

    /// The heartbeat timeout in use.
    pub fn liveness_timeout(&self) -> Duration {
        self.liveness.timeout()
    }

    fn upsert(
        &self,
        id: &CameraId,
        at: Timestamp,
        update: impl FnOnce(&mut CameraRecord),
    ) -> Result<bool> {
        if let Some(mut record) = self.cameras.get_mut(id) {
            record.touch(at);
            update(record.value_mut());
            return Ok(false);
        }

        let claimed = self
            .reserved
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.max_cameras).then_some(n + 1)
            });
        if claimed.is_err() {
            tracing::warn!(
                "Registry full ({} cameras), rejecting {}",
                self.max_cameras,
                id
            );
            return Err(RelayError::RegistryFull {
                limit: self.max_cameras,
            });
        }

        let mut created = false;
        let mut record = self.cameras.entry(id.clone()).or_insert_with(|| {
            created = true;
            CameraRecord::new(id.clone(), at)
        });
        record.touch(at);
        update(record.value_mut());
        drop(record);

        if created {
            tracing::info!("Camera {} registered", id);
        } else {
            // Another first contact for the same camera won the insert.
            self.reserved.fetch_sub(1, Ordering::AcqRel);
        }
        Ok(created)
    }
}
