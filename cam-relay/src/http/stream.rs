//! Adapters from relay subscriptions to HTTP streaming bodies.

use crate::alarms::AlarmSubscription;
use crate::frames::{Frame, FrameSubscription};
use crate::server::CameraRelay;
use axum::body::{Body, Bytes};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::{self, Stream};
use std::convert::Infallible;
use std::sync::Arc;

/// Multipart boundary used by `/video_feed`.
pub const BOUNDARY: &str = "frame";

/// Content type used when a camera did not declare one.
pub const DEFAULT_FRAME_TYPE: &str = "image/jpeg";

/// Encode one frame as a `multipart/x-mixed-replace` part.
pub fn multipart_part(frame: &Frame) -> Bytes {
    let content_type = frame.content_type.as_deref().unwrap_or(DEFAULT_FRAME_TYPE);
    let header = format!(
        "--{BOUNDARY}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\n\r\n",
        frame.payload.len()
    );
    let mut part = Vec::with_capacity(header.len() + frame.payload.len() + 2);
    part.extend_from_slice(header.as_bytes());
    part.extend_from_slice(&frame.payload);
    part.extend_from_slice(b"\r\n");
    Bytes::from(part)
}

/// Body that writes every frame of the subscription as a multipart part.
///
/// The subscription lives inside the body, so a disconnecting viewer drops
/// it and detaches from the camera.
pub fn multipart_body(relay: Arc<CameraRelay>, subscription: FrameSubscription) -> Body {
    let parts = stream::unfold((relay, subscription), |(relay, mut subscription)| async move {
        let frame = subscription.next().await?;
        relay.record_frame_sent();
        Some((
            Ok::<_, Infallible>(multipart_part(&frame)),
            (relay, subscription),
        ))
    });
    Body::from_stream(parts)
}

/// Server-Sent Events stream of alarm events, one `alarm` event per entry
/// with the sequence number as event id.
pub fn alarm_events(
    subscription: AlarmSubscription,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let events = stream::unfold(subscription, |mut subscription| async move {
        let alarm = subscription.next().await?;
        let event = Event::default()
            .event("alarm")
            .id(alarm.sequence.to_string())
            .json_data(&alarm);
        Some((event, subscription))
    });
    Sse::new(events).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cam_types::{CameraId, Timestamp};

    #[test]
    fn part_layout() {
        let frame = Frame {
            camera_id: CameraId::from(1u32),
            number: 1,
            payload: Bytes::from_static(b"jpeg"),
            content_type: None,
            received_at: Timestamp::from_millis(0),
        };
        let part = multipart_part(&frame);
        assert_eq!(
            &part[..],
            b"--frame\r\nContent-Type: image/jpeg\r\nContent-Length: 4\r\n\r\njpeg\r\n"
        );
    }

    #[test]
    fn part_keeps_declared_content_type() {
        let frame = Frame {
            camera_id: CameraId::from(1u32),
            number: 1,
            payload: Bytes::from_static(b"png"),
            content_type: Some("image/png".into()),
            received_at: Timestamp::from_millis(0),
        };
        let part = multipart_part(&frame);
        assert!(part.starts_with(b"--frame\r\nContent-Type: image/png\r\n"));
    }
}
