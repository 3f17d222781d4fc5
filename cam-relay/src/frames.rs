//! Frame relay: one live frame per camera, fanned out to every viewer.
//!
//! Each camera owns a [`FrameChannel`] holding the current frame and a
//! broadcast sender. A push swaps the current frame and broadcasts it under
//! one short, synchronous lock, so a reader sees either the old or the new
//! frame and viewers observe pushes in the order they were applied.
//!
//! Only the newest frame matters. A viewer that falls more than
//! `stream_buffer` frames behind skips the frames it missed instead of
//! slowing the camera down.

use crate::error::{RelayError, Result};
use axum::body::Bytes;
use cam_types::{CameraId, Timestamp};
use dashmap::DashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast::{self, error::RecvError};

/// A single frame as received from a camera.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Camera that pushed the frame.
    pub camera_id: CameraId,
    /// Relay-assigned push counter, used only to de-duplicate fan-out.
    pub number: u64,
    /// Opaque image bytes.
    pub payload: Bytes,
    /// Content type declared by the camera, if any.
    pub content_type: Option<String>,
    /// When the relay received the frame.
    pub received_at: Timestamp,
}

type Viewer = broadcast::Receiver<Arc<Frame>>;

#[derive(Debug, Default)]
struct Slot {
    current: Option<Arc<Frame>>,
    pushed: u64,
}

/// Current frame and fan-out for one camera.
#[derive(Debug)]
struct FrameChannel {
    slot: RwLock<Slot>,
    tx: broadcast::Sender<Arc<Frame>>,
}

impl FrameChannel {
    fn new(buffer: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self {
            slot: RwLock::new(Slot::default()),
            tx,
        }
    }

    fn publish(
        &self,
        camera_id: &CameraId,
        payload: Bytes,
        content_type: Option<String>,
        at: Timestamp,
    ) -> Arc<Frame> {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        slot.pushed += 1;
        let frame = Arc::new(Frame {
            camera_id: camera_id.clone(),
            number: slot.pushed,
            payload,
            content_type,
            received_at: at,
        });
        slot.current = Some(frame.clone());
        // Err only means nobody is watching.
        let _ = self.tx.send(frame.clone());
        frame
    }

    /// Attach a receiver if fewer than `max_viewers` are attached, returning
    /// it with the frame current at that moment.
    ///
    /// Holds the slot write lock throughout, so concurrent attaches cannot
    /// both pass the cap and no push lands between the subscribe and the read.
    fn attach(&self, max_viewers: usize) -> Option<(Viewer, Option<Arc<Frame>>)> {
        let slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        if self.tx.receiver_count() >= max_viewers {
            return None;
        }
        Some((self.tx.subscribe(), slot.current.clone()))
    }

    fn current(&self) -> Option<Arc<Frame>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .clone()
    }
}

/// Latest frame per camera with broadcast fan-out.
#[derive(Debug)]
pub struct FrameRelay {
    channels: DashMap<CameraId, Arc<FrameChannel>>,
    stream_buffer: usize,
    max_viewers: usize,
}

impl FrameRelay {
    /// Create an empty frame relay.
    pub fn new(stream_buffer: usize, max_viewers: usize) -> Self {
        Self {
            channels: DashMap::new(),
            stream_buffer,
            max_viewers,
        }
    }

    /// Replace the current frame for `camera_id` and wake every viewer.
    ///
    /// Never waits on viewers.
    pub fn push(
        &self,
        camera_id: &CameraId,
        payload: Bytes,
        content_type: Option<String>,
        at: Timestamp,
    ) -> Arc<Frame> {
        let frame = self
            .channel(camera_id)
            .publish(camera_id, payload, content_type, at);

        tracing::debug!(
            "Frame {} for camera {} ({} bytes)",
            frame.number,
            camera_id,
            frame.payload.len()
        );
        frame
    }

    /// The current frame, if any was ever pushed.
    pub fn current(&self, camera_id: &CameraId) -> Option<Arc<Frame>> {
        let channel = self.channels.get(camera_id).map(|c| c.value().clone())?;
        channel.current()
    }

    /// Start streaming frames for `camera_id`.
    ///
    /// The subscription yields the current frame first, then every later
    /// push. Without a current frame it fails with `NoFrameAvailable`, unless
    /// `wait_for_first_frame` is set, in which case the first `next()` waits
    /// for the first push.
    pub fn subscribe(
        &self,
        camera_id: &CameraId,
        wait_for_first_frame: bool,
    ) -> Result<FrameSubscription> {
        let channel = self.channel(camera_id);
        let (rx, current) = channel.attach(self.max_viewers).ok_or_else(|| {
            RelayError::TooManyViewers {
                camera: camera_id.clone(),
                limit: self.max_viewers,
            }
        })?;
        if current.is_none() && !wait_for_first_frame {
            return Err(RelayError::NoFrameAvailable {
                camera: camera_id.clone(),
            });
        }

        tracing::debug!(
            "Viewer subscribed to camera {} ({} watching)",
            camera_id,
            channel.tx.receiver_count()
        );

        Ok(FrameSubscription {
            camera_id: camera_id.clone(),
            pending: current,
            last_number: 0,
            rx,
        })
    }

    /// Streaming viewers currently attached to `camera_id`.
    pub fn viewer_count(&self, camera_id: &CameraId) -> usize {
        self.channels
            .get(camera_id)
            .map(|c| c.tx.receiver_count())
            .unwrap_or(0)
    }

    /// Streaming viewers across all cameras.
    pub fn total_viewers(&self) -> usize {
        self.channels
            .iter()
            .map(|entry| entry.value().tx.receiver_count())
            .sum()
    }

    fn channel(&self, camera_id: &CameraId) -> Arc<FrameChannel> {
        if let Some(channel) = self.channels.get(camera_id) {
            return channel.value().clone();
        }
        self.channels
            .entry(camera_id.clone())
            .or_insert_with(|| Arc::new(FrameChannel::new(self.stream_buffer)))
            .value()
            .clone()
    }
}

/// A viewer's live view of one camera.
///
/// Dropping the subscription detaches the viewer immediately.
#[derive(Debug)]
pub struct FrameSubscription {
    camera_id: CameraId,
    pending: Option<Arc<Frame>>,
    last_number: u64,
    rx: broadcast::Receiver<Arc<Frame>>,
}

impl FrameSubscription {
    /// Wait for the next frame.
    ///
    /// Returns `None` only if the camera's channel has been torn down.
    pub async fn next(&mut self) -> Option<Arc<Frame>> {
        if let Some(frame) = self.pending.take() {
            self.last_number = frame.number;
            return Some(frame);
        }

        loop {
            match self.rx.recv().await {
                // Already delivered as the initial frame.
                Ok(frame) if frame.number <= self.last_number => continue,
                Ok(frame) => {
                    self.last_number = frame.number;
                    return Some(frame);
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(
                        "Viewer of camera {} fell behind, skipped {} frames",
                        self.camera_id,
                        skipped
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// The camera being viewed.
    pub fn camera_id(&self) -> &CameraId {
        &self.camera_id
    }
}

impl Drop for FrameSubscription {
    fn drop(&mut self) {
        tracing::debug!("Viewer detached from camera {}", self.camera_id);
    }
}
