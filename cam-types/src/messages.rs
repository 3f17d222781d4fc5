//! JSON bodies exchanged with cameras and viewers.
//!
//! Frames travel as raw binary bodies and never appear here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{CameraId, Sequence, Timestamp};

/// Derived liveness of a camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiveState {
    /// Never heard from.
    Unknown,
    /// Heartbeat within the liveness timeout.
    Online,
    /// Seen before, but the heartbeat has gone stale.
    Offline,
}

impl LiveState {
    /// Lowercase name, as used in headers and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }

    /// True only for [`LiveState::Online`].
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }
}

/// Optional detail a camera attaches to an alarm trigger.
///
/// Unknown fields are kept in `extra` and relayed verbatim.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AlarmMetadata {
    /// Short label, e.g. `"motion"` or `"person"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Detector confidence in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Any other fields supplied by the camera.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A single alarm event as relayed to viewers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmEvent {
    /// Camera that raised the alarm
    pub camera_id: CameraId,
    /// Relay-assigned, strictly increasing per camera
    pub sequence: Sequence,
    /// When the relay accepted the trigger
    pub triggered_at: Timestamp,
    /// Camera-supplied detail
    #[serde(default)]
    pub metadata: AlarmMetadata,
}

/// Body of `POST /camera/register/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// URL viewers can use to stream directly from the camera; `None` clears it.
    #[serde(default)]
    pub stream_url: Option<String>,
}

/// Response to an alarm poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmPollResponse {
    /// Camera polled
    pub camera_id: CameraId,
    /// The `since` value the viewer sent
    pub since: Sequence,
    /// Events with sequence > since, ascending
    pub events: Vec<AlarmEvent>,
    /// Highest sequence ever assigned for this camera
    pub latest_sequence: Sequence,
}

/// Per-camera alarm flag, as served by `/api/alarm_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmStatus {
    /// Whether an alarm is currently raised
    pub active: bool,
    /// Last time the camera or the alarm state changed
    pub last_update: Timestamp,
}

/// Body of `/api/alarm_status`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AlarmStatusResponse {
    /// Alarm flag per known camera
    pub alarms: BTreeMap<CameraId, AlarmStatus>,
}

/// Body of `/api/camera_streams`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CameraStreamsResponse {
    /// Direct-stream URL per known camera, `null` when relayed only
    pub streams: BTreeMap<CameraId, Option<String>>,
}

/// Body of `/api/commands`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommandResponse {
    /// Latest command, cleared by the read
    pub command: Option<String>,
}

/// Status of one camera inside a [`StatusSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraStatus {
    /// Derived liveness
    pub state: LiveState,
    /// Convenience flag, `state == online`
    pub online: bool,
    /// Last heartbeat (or other camera write)
    pub last_heartbeat_at: Timestamp,
    /// Seconds since the last heartbeat, one decimal
    pub last_seen_seconds_ago: f64,
    /// Receipt time of the current frame
    pub last_frame_at: Option<Timestamp>,
    /// True if the current frame is old or the camera is offline
    pub frame_stale: bool,
    /// Highest alarm sequence assigned, if any
    pub last_alarm_sequence: Option<Sequence>,
    /// Whether an alarm is currently raised
    pub alarm_active: bool,
    /// Whether the camera registered a direct-stream URL
    pub stream_registered: bool,
    /// The registered direct-stream URL
    pub stream_url: Option<String>,
    /// Viewers currently streaming frames through the relay
    pub viewers: usize,
}

/// Body of `/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Always `"running"` while the relay serves requests
    pub status: String,
    /// When the snapshot was taken
    pub timestamp: Timestamp,
    /// Every known camera
    pub cameras: BTreeMap<CameraId, CameraStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_state_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&LiveState::Offline).unwrap(), "\"offline\"");
        assert_eq!(LiveState::Online.as_str(), "online");
        assert!(LiveState::Online.is_online());
        assert!(!LiveState::Unknown.is_online());
    }

    #[test]
    fn alarm_metadata_keeps_unknown_fields() {
        let json = r#"{"label":"person","confidence":0.92,"zone":"driveway"}"#;
        let meta: AlarmMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.label.as_deref(), Some("person"));
        assert_eq!(meta.confidence, Some(0.92));
        assert_eq!(meta.extra["zone"], "driveway");

        let back = serde_json::to_value(&meta).unwrap();
        assert_eq!(back["zone"], "driveway");
    }

    #[test]
    fn empty_metadata_serializes_to_empty_object() {
        let meta = AlarmMetadata::default();
        assert_eq!(serde_json::to_string(&meta).unwrap(), "{}");
    }

    #[test]
    fn alarm_event_wire_shape() {
        let event = AlarmEvent {
            camera_id: CameraId::from(2u32),
            sequence: Sequence::new(3),
            triggered_at: Timestamp::from_millis(1_000),
            metadata: AlarmMetadata::default(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["camera_id"], "2");
        assert_eq!(json["sequence"], 3);
        assert_eq!(json["triggered_at"], 1000);
    }

    #[test]
    fn register_request_allows_missing_url() {
        let req: RegisterRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.stream_url, None);

        let req: RegisterRequest =
            serde_json::from_str(r#"{"stream_url":"http://10.0.0.5:8000/stream"}"#).unwrap();
        assert_eq!(req.stream_url.as_deref(), Some("http://10.0.0.5:8000/stream"));
    }

    #[test]
    fn streams_response_uses_camera_keys() {
        let mut resp = CameraStreamsResponse::default();
        resp.streams.insert(CameraId::from(1u32), None);
        resp.streams
            .insert(CameraId::from(2u32), Some("http://cam2/stream".into()));
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json["streams"]["1"].is_null());
        assert_eq!(json["streams"]["2"], "http://cam2/stream");
    }
}
