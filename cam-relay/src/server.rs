//! Main CameraRelay coordination.
//!
//! CameraRelay owns the registry, frame relay, alarm relay, command slot,
//! rate limiters and metrics, and applies the relay-wide policies
//! (registration mode, frame size, offline reads) on top of them.

use crate::alarms::{AlarmRelay, AlarmSubscription};
use crate::commands::{Command, CommandSlot};
use crate::config::Config;
use crate::error::{RelayError, Result};
use crate::frames::{Frame, FrameRelay, FrameSubscription};
use crate::limits::RateLimits;
use crate::registry::CameraRegistry;
use crate::status::StatusAggregator;
use axum::body::Bytes;
use cam_types::{AlarmEvent, AlarmMetadata, CameraId, LiveState, Sequence, Timestamp};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Operational metrics for monitoring relay activity.
///
/// All counters are monotonically increasing (reset only on restart).
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Heartbeats and registrations accepted.
    pub heartbeats_total: AtomicU64,
    /// Frames accepted from cameras.
    pub frames_pushed_total: AtomicU64,
    /// Total frame bytes received.
    pub frame_bytes_received: AtomicU64,
    /// Frames written to streaming viewers and snapshots.
    pub frames_sent_total: AtomicU64,
    /// Alarm events appended.
    pub alarms_triggered_total: AtomicU64,
    /// Active alarms cleared (manually or by the sweep).
    pub alarms_cleared_total: AtomicU64,
    /// Total rate limit rejections (per camera + global).
    pub rate_limit_hits: AtomicU64,
    /// Requests that failed with an error response.
    pub errors_total: AtomicU64,
}

impl RelayMetrics {
    fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Who raised or cleared an alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmSource {
    /// The camera itself. Subject to rate limits and registration policy,
    /// and counts as liveness.
    Camera,
    /// A viewer acting from the website. The camera must already be known.
    Viewer,
}

/// The current frame of a camera plus how fresh it is.
#[derive(Debug, Clone)]
pub struct FrameView {
    /// The latest frame.
    pub frame: Arc<Frame>,
    /// Camera state at read time.
    pub state: LiveState,
    /// True if the camera is offline or the frame is older than `stale_after_secs`.
    pub stale: bool,
}

/// Result of one maintenance sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Cameras that went offline since the last sweep.
    pub went_offline: Vec<CameraId>,
    /// Cameras that came back online since the last sweep.
    pub came_online: Vec<CameraId>,
    /// Alarm events removed by age retention.
    pub alarms_expired: usize,
    /// Cameras whose alarm was cleared because the camera went silent.
    pub alarms_auto_cleared: Vec<CameraId>,
}

/// Main relay server state.
pub struct CameraRelay {
    config: Config,
    registry: CameraRegistry,
    frames: FrameRelay,
    alarms: AlarmRelay,
    commands: CommandSlot,
    /// Rate limiters for camera writes.
    rate_limits: RateLimits,
    /// Operational metrics (counters).
    metrics: RelayMetrics,
}

impl std::fmt::Debug for CameraRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraRelay")
            .field("config", &self.config)
            .field("rate_limits", &self.rate_limits)
            .field("metrics", &self.metrics)
            .field("cameras_count", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl CameraRelay {
    /// Create a new CameraRelay with the given config.
    pub fn new(config: Config) -> Self {
        let rate_limits = RateLimits::new(&config.limits);
        Self {
            registry: CameraRegistry::new(
                config.registry.liveness_timeout(),
                config.registry.max_cameras,
            ),
            frames: FrameRelay::new(
                config.frames.stream_buffer,
                config.frames.max_viewers_per_camera,
            ),
            alarms: AlarmRelay::new(config.alarms.retention(), config.alarms.stream_buffer),
            commands: CommandSlot::new(),
            rate_limits,
            metrics: RelayMetrics::default(),
            config,
        }
    }

    /// Get the relay configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get access to the camera registry.
    pub fn registry(&self) -> &CameraRegistry {
        &self.registry
    }

    /// Get access to the frame relay.
    pub fn frames(&self) -> &FrameRelay {
        &self.frames
    }

    /// Get access to the alarm relay.
    pub fn alarms(&self) -> &AlarmRelay {
        &self.alarms
    }

    /// Get access to the rate limiters.
    pub fn rate_limits(&self) -> &RateLimits {
        &self.rate_limits
    }

    /// Get access to the operational metrics.
    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }

    /// Read-only view across registry, frames and alarms.
    pub fn status(&self) -> StatusAggregator<'_> {
        StatusAggregator::new(self)
    }

    /// Record a camera heartbeat.
    pub fn heartbeat(&self, camera_id: &CameraId, at: Timestamp) -> Result<()> {
        self.check_rate(camera_id)?;
        self.registry.heartbeat(camera_id, at)?;
        RelayMetrics::incr(&self.metrics.heartbeats_total);
        Ok(())
    }

    /// Register a camera and set (or clear) its direct-stream URL.
    pub fn register(
        &self,
        camera_id: &CameraId,
        stream_url: Option<String>,
        at: Timestamp,
    ) -> Result<()> {
        self.check_rate(camera_id)?;
        let url = stream_url.clone();
        self.registry.register(camera_id, stream_url, at)?;
        match url {
            Some(url) => tracing::info!("Camera {} stream registered at {}", camera_id, url),
            None => tracing::debug!("Camera {} has no direct stream", camera_id),
        }
        RelayMetrics::incr(&self.metrics.heartbeats_total);
        Ok(())
    }

    /// Replace the camera's current frame.
    pub fn push_frame(
        &self,
        camera_id: &CameraId,
        payload: Bytes,
        content_type: Option<String>,
        at: Timestamp,
    ) -> Result<Arc<Frame>> {
        if payload.is_empty() {
            return Err(RelayError::EmptyFrame {
                camera: camera_id.clone(),
            });
        }
        let limit = self.config.frames.max_frame_bytes;
        if payload.len() > limit {
            return Err(RelayError::PayloadTooLarge {
                size: payload.len(),
                limit,
            });
        }
        self.check_rate(camera_id)?;
        self.registry
            .admit(camera_id, at, self.config.registry.auto_register)?;

        let size = payload.len() as u64;
        let frame = self.frames.push(camera_id, payload, content_type, at);
        self.registry.record_frame(camera_id, at);

        RelayMetrics::incr(&self.metrics.frames_pushed_total);
        self.metrics
            .frame_bytes_received
            .fetch_add(size, Ordering::Relaxed);
        Ok(frame)
    }

    /// The current frame with its freshness at `now`.
    pub fn current_frame(&self, camera_id: &CameraId, now: Timestamp) -> Result<FrameView> {
        let state = self.readable_state(camera_id, now)?;
        let frame = self
            .frames
            .current(camera_id)
            .ok_or_else(|| RelayError::NoFrameAvailable {
                camera: camera_id.clone(),
            })?;
        let stale = !state.is_online()
            || cam_core::liveness::is_stale(
                Some(frame.received_at),
                now,
                self.config.frames.stale_after(),
            );
        Ok(FrameView {
            frame,
            state,
            stale,
        })
    }

    /// Start a live frame stream for a viewer.
    pub fn stream_frames(&self, camera_id: &CameraId, now: Timestamp) -> Result<FrameSubscription> {
        self.readable_state(camera_id, now)?;
        self.frames
            .subscribe(camera_id, self.config.frames.wait_for_first_frame)
    }

    /// Append an alarm event for a camera.
    pub fn trigger_alarm(
        &self,
        camera_id: &CameraId,
        metadata: AlarmMetadata,
        at: Timestamp,
        source: AlarmSource,
    ) -> Result<AlarmEvent> {
        self.admit_alarm_action(camera_id, at, source, self.config.registry.auto_register)?;

        let event = self.alarms.trigger(camera_id, metadata, at);
        self.commands.set(Command::TriggerAlarm(camera_id.clone()));
        RelayMetrics::incr(&self.metrics.alarms_triggered_total);
        Ok(event)
    }

    /// Clear a camera's active alarm. Returns `true` if one was active.
    ///
    /// A camera clearing its own alarm is rate limited and refreshes its
    /// liveness, but never registers an unknown camera.
    pub fn clear_alarm(
        &self,
        camera_id: &CameraId,
        at: Timestamp,
        source: AlarmSource,
    ) -> Result<bool> {
        self.admit_alarm_action(camera_id, at, source, false)?;
        let cleared = self.alarms.clear(camera_id, at);
        self.commands.set(Command::ClearAlarm(camera_id.clone()));
        if cleared {
            RelayMetrics::incr(&self.metrics.alarms_cleared_total);
        }
        Ok(cleared)
    }

    /// Clear every active alarm. Returns the cameras that were active.
    pub fn clear_all_alarms(&self, at: Timestamp) -> Vec<CameraId> {
        let cleared = self.alarms.clear_all(at);
        self.commands.set(Command::ClearAllAlarms);
        self.metrics
            .alarms_cleared_total
            .fetch_add(cleared.len() as u64, Ordering::Relaxed);
        tracing::info!("Cleared {} active alarm(s)", cleared.len());
        cleared
    }

    /// Retained alarm events after `since`.
    ///
    /// An empty result is not an error.
    pub fn poll_alarms(
        &self,
        camera_id: &CameraId,
        since: Sequence,
        now: Timestamp,
    ) -> Result<Vec<AlarmEvent>> {
        self.registry.require(camera_id)?;
        Ok(self.alarms.poll(camera_id, since, now))
    }

    /// Start a live alarm stream, replaying retained events after `since`.
    pub fn stream_alarms(
        &self,
        camera_id: &CameraId,
        since: Option<Sequence>,
        now: Timestamp,
    ) -> Result<AlarmSubscription> {
        self.registry.require(camera_id)?;
        Ok(self.alarms.subscribe(camera_id, since, now))
    }

    /// Highest alarm sequence issued for the camera, zero if none.
    pub fn latest_alarm_sequence(&self, camera_id: &CameraId) -> Sequence {
        self.alarms
            .last_sequence(camera_id)
            .unwrap_or_else(Sequence::zero)
    }

    /// Return and clear the pending viewer command.
    pub fn take_command(&self) -> Option<Command> {
        self.commands.take()
    }

    /// Derived state of a camera at `now`.
    pub fn state(&self, camera_id: &CameraId, now: Timestamp) -> LiveState {
        self.registry.state(camera_id, now)
    }

    /// Periodic maintenance: log state transitions, expire alarm events,
    /// auto-clear alarms of silent cameras and shrink limiter state.
    pub fn sweep(&self, now: Timestamp) -> SweepReport {
        let changes = self.registry.sweep(now);
        for camera in &changes.went_offline {
            tracing::info!("Camera {} went offline", camera);
        }
        for camera in &changes.came_online {
            tracing::info!("Camera {} back online", camera);
        }

        let alarms_expired = self.alarms.evict_expired(now);

        let mut alarms_auto_cleared = Vec::new();
        if let Some(threshold) = self.config.alarms.auto_clear_after() {
            for (record, _) in self.registry.list(now) {
                let silent = now.saturating_since(record.last_heartbeat_at) > threshold;
                let active = self
                    .alarms
                    .status(&record.id)
                    .is_some_and(|status| status.active);
                if silent && active && self.alarms.clear(&record.id, now) {
                    tracing::info!("Auto-cleared alarm for silent camera {}", record.id);
                    RelayMetrics::incr(&self.metrics.alarms_cleared_total);
                    alarms_auto_cleared.push(record.id);
                }
            }
        }

        self.rate_limits.shrink();

        SweepReport {
            went_offline: changes.went_offline,
            came_online: changes.came_online,
            alarms_expired,
            alarms_auto_cleared,
        }
    }

    /// Count a request that ended in an error response.
    pub fn record_error(&self) {
        RelayMetrics::incr(&self.metrics.errors_total);
    }

    /// Count a frame delivered to a viewer.
    pub fn record_frame_sent(&self) {
        RelayMetrics::incr(&self.metrics.frames_sent_total);
    }

    fn readable_state(&self, camera_id: &CameraId, now: Timestamp) -> Result<LiveState> {
        self.registry.require(camera_id)?;
        let state = self.registry.state(camera_id, now);
        if state == LiveState::Offline && self.config.frames.reject_offline_reads {
            return Err(RelayError::CameraOffline {
                camera: camera_id.clone(),
            });
        }
        Ok(state)
    }

    fn admit_alarm_action(
        &self,
        camera_id: &CameraId,
        at: Timestamp,
        source: AlarmSource,
        auto_register: bool,
    ) -> Result<()> {
        match source {
            AlarmSource::Camera => {
                self.check_rate(camera_id)?;
                self.registry.admit(camera_id, at, auto_register)
            }
            AlarmSource::Viewer => self.registry.require(camera_id),
        }
    }

    fn check_rate(&self, camera_id: &CameraId) -> Result<()> {
        let checked = self
            .rate_limits
            .check_global()
            .and_then(|_| self.rate_limits.check_camera(camera_id));
        checked.map_err(|e| {
            RelayMetrics::incr(&self.metrics.rate_limit_hits);
            tracing::warn!("Rate limited camera {}: {}", camera_id, e);
            RelayError::RateLimited {
                reason: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cam(n: u32) -> CameraId {
        CameraId::from(n)
    }

    fn ms(millis: u64) -> Timestamp {
        Timestamp::from_millis(millis)
    }

    fn relay() -> CameraRelay {
        CameraRelay::new(Config::default())
    }

    fn strict() -> CameraRelay {
        let mut config = Config::default();
        config.registry.auto_register = false;
        CameraRelay::new(config)
    }

    #[test]
    fn relay_is_debug() {
        let debug = format!("{:?}", relay());
        assert!(debug.contains("CameraRelay"));
    }

    #[test]
    fn current_frame_is_last_write() {
        let relay = relay();
        relay.heartbeat(&cam(1), ms(0)).unwrap();
        for (i, body) in ["a", "b", "c"].iter().enumerate() {
            relay
                .push_frame(&cam(1), Bytes::from_static(body.as_bytes()), None, ms(i as u64))
                .unwrap();
        }
        let view = relay.current_frame(&cam(1), ms(3)).unwrap();
        assert_eq!(&view.frame.payload[..], b"c");
        assert_eq!(view.state, LiveState::Online);
        assert!(!view.stale);
    }

    #[test]
    fn unknown_camera_and_missing_frame_are_distinct() {
        let relay = relay();
        assert!(matches!(
            relay.current_frame(&cam(9), ms(0)),
            Err(RelayError::UnknownCamera { .. })
        ));

        relay.heartbeat(&cam(1), ms(0)).unwrap();
        assert!(matches!(
            relay.current_frame(&cam(1), ms(0)),
            Err(RelayError::NoFrameAvailable { .. })
        ));
        assert!(matches!(
            relay.stream_frames(&cam(1), ms(0)),
            Err(RelayError::NoFrameAvailable { .. })
        ));
    }

    #[test]
    fn push_rejects_empty_and_oversized_frames() {
        let mut config = Config::default();
        config.frames.max_frame_bytes = 4;
        let relay = CameraRelay::new(config);

        assert!(matches!(
            relay.push_frame(&cam(1), Bytes::new(), None, ms(0)),
            Err(RelayError::EmptyFrame { .. })
        ));
        assert!(matches!(
            relay.push_frame(&cam(1), Bytes::from_static(b"12345"), None, ms(0)),
            Err(RelayError::PayloadTooLarge { size: 5, limit: 4 })
        ));
        // Rejected pushes never register the camera.
        assert!(relay.registry().is_empty());

        relay
            .push_frame(&cam(1), Bytes::from_static(b"1234"), None, ms(0))
            .unwrap();
        assert_eq!(relay.registry().len(), 1);
    }

    #[test]
    fn strict_mode_rejects_unknown_writers() {
        let relay = strict();
        assert!(matches!(
            relay.push_frame(&cam(1), Bytes::from_static(b"x"), None, ms(0)),
            Err(RelayError::UnknownCamera { .. })
        ));
        assert!(matches!(
            relay.trigger_alarm(&cam(1), AlarmMetadata::default(), ms(0), AlarmSource::Camera),
            Err(RelayError::UnknownCamera { .. })
        ));

        relay.heartbeat(&cam(1), ms(0)).unwrap();
        relay
            .push_frame(&cam(1), Bytes::from_static(b"x"), None, ms(1))
            .unwrap();
    }

    #[test]
    fn pushes_refresh_liveness() {
        let relay = relay();
        relay.heartbeat(&cam(1), ms(0)).unwrap();
        relay
            .push_frame(&cam(1), Bytes::from_static(b"x"), None, ms(25_000))
            .unwrap();
        assert_eq!(relay.state(&cam(1), ms(50_000)), LiveState::Online);
        assert_eq!(relay.state(&cam(1), ms(55_001)), LiveState::Offline);
    }

    #[test]
    fn offline_reads_are_stale_or_rejected() {
        let relay = relay();
        relay
            .push_frame(&cam(1), Bytes::from_static(b"x"), None, ms(0))
            .unwrap();

        let view = relay.current_frame(&cam(1), ms(31_000)).unwrap();
        assert_eq!(view.state, LiveState::Offline);
        assert!(view.stale);

        let mut config = Config::default();
        config.frames.reject_offline_reads = true;
        let relay = CameraRelay::new(config);
        relay
            .push_frame(&cam(1), Bytes::from_static(b"x"), None, ms(0))
            .unwrap();
        assert!(matches!(
            relay.current_frame(&cam(1), ms(31_000)),
            Err(RelayError::CameraOffline { .. })
        ));
    }

    #[test]
    fn old_frame_from_online_camera_is_stale() {
        let relay = relay();
        relay
            .push_frame(&cam(1), Bytes::from_static(b"x"), None, ms(0))
            .unwrap();
        relay.heartbeat(&cam(1), ms(20_000)).unwrap();

        let view = relay.current_frame(&cam(1), ms(20_000)).unwrap();
        assert_eq!(view.state, LiveState::Online);
        assert!(view.stale);
    }

    #[tokio::test]
    async fn subscriber_sees_pushes_in_order() {
        let mut config = Config::default();
        config.frames.wait_for_first_frame = true;
        let relay = CameraRelay::new(config);

        relay.heartbeat(&cam(1), ms(0)).unwrap();
        let mut sub = relay.stream_frames(&cam(1), ms(500)).unwrap();
        relay
            .push_frame(&cam(1), Bytes::from_static(b"A"), None, ms(1_000))
            .unwrap();
        relay
            .push_frame(&cam(1), Bytes::from_static(b"B"), None, ms(2_000))
            .unwrap();

        assert_eq!(&sub.next().await.unwrap().payload[..], b"A");
        assert_eq!(&sub.next().await.unwrap().payload[..], b"B");
        let view = relay.current_frame(&cam(1), ms(3_000)).unwrap();
        assert_eq!(&view.frame.payload[..], b"B");
    }

    #[test]
    fn triggers_sequence_and_poll() {
        let relay = relay();
        let seqs: Vec<_> = (0..3)
            .map(|i| {
                relay
                    .trigger_alarm(&cam(2), AlarmMetadata::default(), ms(i), AlarmSource::Camera)
                    .unwrap()
                    .sequence
                    .value()
            })
            .collect();
        assert_eq!(seqs, vec![1, 2, 3]);

        let polled: Vec<_> = relay
            .poll_alarms(&cam(2), Sequence::new(1), ms(10))
            .unwrap()
            .iter()
            .map(|e| e.sequence.value())
            .collect();
        assert_eq!(polled, vec![2, 3]);
        assert!(relay
            .poll_alarms(&cam(2), Sequence::new(3), ms(10))
            .unwrap()
            .is_empty());
        assert_eq!(relay.latest_alarm_sequence(&cam(2)), Sequence::new(3));
    }

    #[test]
    fn poll_unknown_camera_fails() {
        let relay = relay();
        assert!(matches!(
            relay.poll_alarms(&cam(4), Sequence::zero(), ms(0)),
            Err(RelayError::UnknownCamera { .. })
        ));
    }

    #[test]
    fn viewer_trigger_requires_known_camera() {
        let relay = relay();
        assert!(matches!(
            relay.trigger_alarm(&cam(1), AlarmMetadata::default(), ms(0), AlarmSource::Viewer),
            Err(RelayError::UnknownCamera { .. })
        ));

        relay.heartbeat(&cam(1), ms(0)).unwrap();
        relay
            .trigger_alarm(&cam(1), AlarmMetadata::default(), ms(40_000), AlarmSource::Viewer)
            .unwrap();
        // A viewer trigger is not camera liveness.
        assert_eq!(relay.state(&cam(1), ms(40_000)), LiveState::Offline);
    }

    #[test]
    fn camera_clear_counts_as_liveness() {
        let relay = relay();
        assert!(matches!(
            relay.clear_alarm(&cam(1), ms(0), AlarmSource::Camera),
            Err(RelayError::UnknownCamera { .. })
        ));
        assert!(relay.registry().is_empty());

        relay.heartbeat(&cam(1), ms(0)).unwrap();
        relay
            .trigger_alarm(&cam(1), AlarmMetadata::default(), ms(0), AlarmSource::Camera)
            .unwrap();

        assert!(relay
            .clear_alarm(&cam(1), ms(40_000), AlarmSource::Viewer)
            .unwrap());
        assert_eq!(relay.state(&cam(1), ms(40_000)), LiveState::Offline);

        relay
            .clear_alarm(&cam(1), ms(40_000), AlarmSource::Camera)
            .unwrap();
        assert_eq!(relay.state(&cam(1), ms(40_000)), LiveState::Online);
    }

    #[test]
    fn camera_clear_is_rate_limited() {
        let mut config = Config::default();
        config.limits.camera_requests_per_second = 1;
        let relay = CameraRelay::new(config);

        relay.heartbeat(&cam(1), ms(0)).unwrap();
        assert!(matches!(
            relay.clear_alarm(&cam(1), ms(0), AlarmSource::Camera),
            Err(RelayError::RateLimited { .. })
        ));
        // Viewers are not subject to the per-camera limiter.
        relay
            .clear_alarm(&cam(1), ms(0), AlarmSource::Viewer)
            .unwrap();
    }

    #[test]
    fn alarm_actions_update_command_slot() {
        let relay = relay();
        assert_eq!(relay.take_command(), None);

        relay
            .trigger_alarm(&cam(1), AlarmMetadata::default(), ms(0), AlarmSource::Camera)
            .unwrap();
        assert_eq!(relay.take_command(), Some(Command::TriggerAlarm(cam(1))));
        assert_eq!(relay.take_command(), None);

        assert!(relay
            .clear_alarm(&cam(1), ms(1), AlarmSource::Viewer)
            .unwrap());
        assert_eq!(relay.take_command(), Some(Command::ClearAlarm(cam(1))));

        relay.clear_all_alarms(ms(2));
        assert_eq!(relay.take_command(), Some(Command::ClearAllAlarms));
    }

    #[test]
    fn rate_limit_rejects_flooding_camera() {
        let mut config = Config::default();
        config.limits.camera_requests_per_second = 2;
        let relay = CameraRelay::new(config);

        relay.heartbeat(&cam(1), ms(0)).unwrap();
        relay.heartbeat(&cam(1), ms(0)).unwrap();
        assert!(matches!(
            relay.heartbeat(&cam(1), ms(0)),
            Err(RelayError::RateLimited { .. })
        ));
        // Other cameras are unaffected.
        relay.heartbeat(&cam(2), ms(0)).unwrap();
        assert_eq!(relay.metrics().rate_limit_hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn sweep_reports_transitions_and_auto_clears() {
        let relay = relay();
        relay.heartbeat(&cam(1), ms(0)).unwrap();
        relay.heartbeat(&cam(2), ms(0)).unwrap();
        relay
            .trigger_alarm(&cam(1), AlarmMetadata::default(), ms(0), AlarmSource::Camera)
            .unwrap();

        let report = relay.sweep(ms(10_000));
        assert_eq!(report, SweepReport::default());

        relay.heartbeat(&cam(2), ms(50_000)).unwrap();
        let report = relay.sweep(ms(61_000));
        assert_eq!(report.went_offline, vec![cam(1)]);
        assert_eq!(report.alarms_auto_cleared, vec![cam(1)]);
        assert!(!relay.alarms().status(&cam(1)).unwrap().active);

        relay.heartbeat(&cam(1), ms(62_000)).unwrap();
        let report = relay.sweep(ms(62_000));
        assert_eq!(report.came_online, vec![cam(1)]);
    }

    #[test]
    fn metrics_count_writes() {
        let relay = relay();
        relay.heartbeat(&cam(1), ms(0)).unwrap();
        relay
            .push_frame(&cam(1), Bytes::from_static(b"abc"), None, ms(0))
            .unwrap();
        relay
            .trigger_alarm(&cam(1), AlarmMetadata::default(), ms(0), AlarmSource::Camera)
            .unwrap();

        let m = relay.metrics();
        assert_eq!(m.heartbeats_total.load(Ordering::Relaxed), 1);
        assert_eq!(m.frames_pushed_total.load(Ordering::Relaxed), 1);
        assert_eq!(m.frame_bytes_received.load(Ordering::Relaxed), 3);
        assert_eq!(m.alarms_triggered_total.load(Ordering::Relaxed), 1);
    }
}
