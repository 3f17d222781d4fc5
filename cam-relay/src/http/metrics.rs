//! Prometheus metrics endpoint.

use crate::server::CameraRelay;
use axum::{http::header::CONTENT_TYPE, response::IntoResponse, Extension};
use cam_types::Timestamp;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Prometheus metrics handler.
///
/// Returns metrics in Prometheus text format.
/// Includes both gauges (current state) and counters (monotonic since startup).
pub async fn metrics_handler(Extension(relay): Extension<Arc<CameraRelay>>) -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        render(&relay),
    )
}

fn render(relay: &CameraRelay) -> String {
    let m = relay.metrics();

    // Gauges, computed from live state
    let cameras = relay.registry().len();
    let online = relay.registry().online_count(Timestamp::now());
    let viewers = relay.frames().total_viewers();
    let alarm_subscribers = relay.alarms().subscriber_count();
    let limiter_keys = relay.rate_limits().camera_keys_count();

    // Counters, monotonic since startup
    let heartbeats = m.heartbeats_total.load(Ordering::Relaxed);
    let frames_pushed = m.frames_pushed_total.load(Ordering::Relaxed);
    let frame_bytes = m.frame_bytes_received.load(Ordering::Relaxed);
    let frames_sent = m.frames_sent_total.load(Ordering::Relaxed);
    let alarms_triggered = m.alarms_triggered_total.load(Ordering::Relaxed);
    let alarms_cleared = m.alarms_cleared_total.load(Ordering::Relaxed);
    let rate_limits = m.rate_limit_hits.load(Ordering::Relaxed);
    let errors = m.errors_total.load(Ordering::Relaxed);

    format!(
        r#"# HELP camlink_relay_cameras Number of known cameras
# TYPE camlink_relay_cameras gauge
camlink_relay_cameras {cameras}

# HELP camlink_relay_cameras_online Number of cameras with a recent heartbeat
# TYPE camlink_relay_cameras_online gauge
camlink_relay_cameras_online {online}

# HELP camlink_relay_frame_viewers Streaming viewers attached to camera feeds
# TYPE camlink_relay_frame_viewers gauge
camlink_relay_frame_viewers {viewers}

# HELP camlink_relay_alarm_subscribers Live alarm stream subscribers
# TYPE camlink_relay_alarm_subscribers gauge
camlink_relay_alarm_subscribers {alarm_subscribers}

# HELP camlink_relay_rate_limiter_keys Cameras tracked by the rate limiter
# TYPE camlink_relay_rate_limiter_keys gauge
camlink_relay_rate_limiter_keys {limiter_keys}

# HELP camlink_relay_info Server information
# TYPE camlink_relay_info gauge
camlink_relay_info{{version="{version}"}} 1

# HELP camlink_relay_heartbeats_total Heartbeats and registrations accepted
# TYPE camlink_relay_heartbeats_total counter
camlink_relay_heartbeats_total {heartbeats}

# HELP camlink_relay_frames_pushed_total Frames accepted from cameras
# TYPE camlink_relay_frames_pushed_total counter
camlink_relay_frames_pushed_total {frames_pushed}

# HELP camlink_relay_frame_bytes_received_total Frame bytes received from cameras
# TYPE camlink_relay_frame_bytes_received_total counter
camlink_relay_frame_bytes_received_total {frame_bytes}

# HELP camlink_relay_frames_sent_total Frames delivered to viewers
# TYPE camlink_relay_frames_sent_total counter
camlink_relay_frames_sent_total {frames_sent}

# HELP camlink_relay_alarms_triggered_total Alarm events appended
# TYPE camlink_relay_alarms_triggered_total counter
camlink_relay_alarms_triggered_total {alarms_triggered}

# HELP camlink_relay_alarms_cleared_total Active alarms cleared
# TYPE camlink_relay_alarms_cleared_total counter
camlink_relay_alarms_cleared_total {alarms_cleared}

# HELP camlink_relay_rate_limit_hits_total Total rate limit rejections
# TYPE camlink_relay_rate_limit_hits_total counter
camlink_relay_rate_limit_hits_total {rate_limits}

# HELP camlink_relay_errors_total Requests answered with an error
# TYPE camlink_relay_errors_total counter
camlink_relay_errors_total {errors}
"#,
        version = env!("CARGO_PKG_VERSION"),
    )
}
