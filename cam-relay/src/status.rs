//! Read-only status views composed from the registry, frame relay and
//! alarm relay.
//!
//! Each component is queried on its own; no lock is held across components,
//! so a snapshot is consistent per camera field rather than globally.

use crate::server::CameraRelay;
use cam_core::liveness;
use cam_types::{
    AlarmStatus, AlarmStatusResponse, CameraStatus, CameraStreamsResponse, StatusSnapshot,
    Timestamp,
};

/// Borrowed view over a [`CameraRelay`].
#[derive(Debug, Clone, Copy)]
pub struct StatusAggregator<'a> {
    relay: &'a CameraRelay,
}

impl<'a> StatusAggregator<'a> {
    /// Wrap a relay.
    pub fn new(relay: &'a CameraRelay) -> Self {
        Self { relay }
    }

    /// Full per-camera status at `now`.
    pub fn snapshot(&self, now: Timestamp) -> StatusSnapshot {
        let stale_after = self.relay.config().frames.stale_after();
        let cameras = self
            .relay
            .registry()
            .list(now)
            .into_iter()
            .map(|(record, state)| {
                let alarm = self.relay.alarms().status(&record.id);
                let status = CameraStatus {
                    state,
                    online: state.is_online(),
                    last_heartbeat_at: record.last_heartbeat_at,
                    last_seen_seconds_ago: liveness::seconds_ago(record.last_heartbeat_at, now),
                    last_frame_at: record.last_frame_at,
                    frame_stale: !state.is_online()
                        || liveness::is_stale(record.last_frame_at, now, stale_after),
                    last_alarm_sequence: self.relay.alarms().last_sequence(&record.id),
                    alarm_active: alarm.is_some_and(|a| a.active),
                    stream_registered: record.stream_url.is_some(),
                    stream_url: record.stream_url,
                    viewers: self.relay.frames().viewer_count(&record.id),
                };
                (record.id, status)
            })
            .collect();

        StatusSnapshot {
            status: "running".to_string(),
            timestamp: now,
            cameras,
        }
    }

    /// Alarm flag per known camera.
    ///
    /// `last_update` is the later of the last alarm change and the last
    /// time the camera was seen.
    pub fn alarm_status(&self, now: Timestamp) -> AlarmStatusResponse {
        let alarms = self
            .relay
            .registry()
            .list(now)
            .into_iter()
            .map(|(record, _)| {
                let status = match self.relay.alarms().status(&record.id) {
                    Some(alarm) => AlarmStatus {
                        active: alarm.active,
                        last_update: alarm.last_update.max(record.last_heartbeat_at),
                    },
                    None => AlarmStatus {
                        active: false,
                        last_update: record.last_heartbeat_at,
                    },
                };
                (record.id, status)
            })
            .collect();
        AlarmStatusResponse { alarms }
    }

    /// Direct-stream URL per known camera.
    pub fn camera_streams(&self, now: Timestamp) -> CameraStreamsResponse {
        let streams = self
            .relay
            .registry()
            .list(now)
            .into_iter()
            .map(|(record, _)| (record.id, record.stream_url))
            .collect();
        CameraStreamsResponse { streams }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::server::{AlarmSource, CameraRelay};
    use axum::body::Bytes;
    use cam_types::{AlarmMetadata, CameraId, LiveState, Sequence, Timestamp};

    fn cam(n: u32) -> CameraId {
        CameraId::from(n)
    }

    fn ms(millis: u64) -> Timestamp {
        Timestamp::from_millis(millis)
    }

    #[test]
    fn empty_relay_snapshot() {
        let relay = CameraRelay::new(Config::default());
        let snapshot = relay.status().snapshot(ms(0));
        assert_eq!(snapshot.status, "running");
        assert!(snapshot.cameras.is_empty());
    }

    #[test]
    fn snapshot_composes_all_components() {
        let relay = CameraRelay::new(Config::default());
        relay
            .register(&cam(1), Some("http://10.0.0.5:8080/video".into()), ms(0))
            .unwrap();
        relay
            .push_frame(&cam(1), Bytes::from_static(b"jpeg"), None, ms(1_000))
            .unwrap();
        relay
            .trigger_alarm(&cam(1), AlarmMetadata::default(), ms(2_000), AlarmSource::Camera)
            .unwrap();
        relay.heartbeat(&cam(2), ms(0)).unwrap();

        let snapshot = relay.status().snapshot(ms(2_500));
        let one = &snapshot.cameras[&cam(1)];
        assert_eq!(one.state, LiveState::Online);
        assert!(one.online);
        assert_eq!(one.last_heartbeat_at, ms(2_000));
        assert_eq!(one.last_seen_seconds_ago, 0.5);
        assert_eq!(one.last_frame_at, Some(ms(1_000)));
        assert!(!one.frame_stale);
        assert_eq!(one.last_alarm_sequence, Some(Sequence::new(1)));
        assert!(one.alarm_active);
        assert!(one.stream_registered);
        assert_eq!(one.viewers, 0);

        let two = &snapshot.cameras[&cam(2)];
        assert!(two.frame_stale);
        assert_eq!(two.last_alarm_sequence, None);
        assert!(!two.alarm_active);
        assert!(!two.stream_registered);
    }

    #[test]
    fn offline_camera_is_flagged() {
        let relay = CameraRelay::new(Config::default());
        relay.heartbeat(&cam(1), ms(0)).unwrap();
        let snapshot = relay.status().snapshot(ms(31_000));
        let one = &snapshot.cameras[&cam(1)];
        assert_eq!(one.state, LiveState::Offline);
        assert!(!one.online);
        assert_eq!(one.last_seen_seconds_ago, 31.0);
    }

    #[test]
    fn alarm_status_covers_every_camera() {
        let relay = CameraRelay::new(Config::default());
        relay.heartbeat(&cam(1), ms(5_000)).unwrap();
        relay
            .trigger_alarm(&cam(2), AlarmMetadata::default(), ms(1_000), AlarmSource::Camera)
            .unwrap();

        let status = relay.status().alarm_status(ms(6_000));
        assert!(!status.alarms[&cam(1)].active);
        assert_eq!(status.alarms[&cam(1)].last_update, ms(5_000));
        assert!(status.alarms[&cam(2)].active);
        assert_eq!(status.alarms[&cam(2)].last_update, ms(1_000));
    }

    #[test]
    fn camera_streams_lists_urls() {
        let relay = CameraRelay::new(Config::default());
        relay
            .register(&cam(1), Some("rtsp://cam1/live".into()), ms(0))
            .unwrap();
        relay.heartbeat(&cam(2), ms(0)).unwrap();

        let streams = relay.status().camera_streams(ms(0)).streams;
        assert_eq!(streams[&cam(1)].as_deref(), Some("rtsp://cam1/live"));
        assert_eq!(streams[&cam(2)], None);
    }
}
