//! HTTP endpoints for camlink-relay.
//!
//! Cameras push heartbeats, frames and alarms; viewers read snapshots,
//! stream video, poll or stream alarms, and read status. Health and metrics
//! sit alongside.

pub mod health;
mod metrics;
pub mod stream;

use crate::error::{RelayError, Result};
use crate::server::{AlarmSource, CameraRelay};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, Request},
    http::{
        header::{self, HeaderMap, HeaderName},
        Method, StatusCode, Uri,
    },
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use cam_types::{
    AlarmMetadata, AlarmPollResponse, AlarmStatusResponse, CameraId, CameraStreamsResponse,
    CommandResponse, RegisterRequest, Sequence, StatusSnapshot, Timestamp,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use health::HealthStatus;

const X_CAMERA_STATE: HeaderName = HeaderName::from_static("x-camera-state");
const X_FRAME_STALE: HeaderName = HeaderName::from_static("x-frame-stale");
const X_FRAME_TIMESTAMP: HeaderName = HeaderName::from_static("x-frame-timestamp");
const LAST_EVENT_ID: HeaderName = HeaderName::from_static("last-event-id");

/// Build the HTTP router with all endpoints.
pub fn build_router(relay: Arc<CameraRelay>) -> Router {
    let http = relay.config().http.clone();
    // One byte of headroom so oversized frames reach the relay and get a JSON error.
    let body_limit = relay.config().frames.max_frame_bytes.saturating_add(1);

    let mut router = Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health::health_handler))
        // Camera side
        .route("/camera/heartbeat/:id", post(heartbeat_handler))
        .route("/camera/register/:id", post(register_handler))
        .route("/camera/push_frame/:id", post(push_frame_handler))
        .route("/camera/trigger_alarm/:id", post(camera_trigger_handler))
        .route("/camera/clear_alarm/:id", post(camera_clear_handler))
        // Viewer side
        .route("/video_feed/:id", get(video_feed_handler))
        .route("/snapshot/:id", get(snapshot_handler))
        .route("/camera/alarms/:id", get(poll_alarms_handler))
        .route("/camera/alarms/:id/stream", get(alarm_stream_handler))
        .route("/status", get(status_handler))
        .route("/api/camera_streams", get(camera_streams_handler))
        .route("/api/alarm_status", get(alarm_status_handler))
        .route("/api/commands", get(commands_handler))
        .route("/api/trigger_alarm/:id", post(viewer_trigger_handler))
        .route("/api/clear_alarm/:id", post(viewer_clear_handler))
        .route("/api/clear_all_alarms", post(clear_all_handler))
        .fallback(legacy_alarm_handler);

    if http.metrics_enabled {
        router = router.route("/metrics", get(metrics::metrics_handler));
    }

    router = router
        .layer(middleware::from_fn(count_errors))
        .layer(Extension(relay))
        .layer(DefaultBodyLimit::max(body_limit));

    if http.cors_enabled {
        router = router.layer(CorsLayer::permissive());
    }

    router.layer(TraceLayer::new_for_http())
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::UnknownCamera { .. } => StatusCode::NOT_FOUND,
            Self::InvalidCameraId(_) | Self::InvalidPayload { .. } | Self::EmptyFrame { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::CameraOffline { .. }
            | Self::NoFrameAvailable { .. }
            | Self::TooManyViewers { .. }
            | Self::RegistryFull { .. } => StatusCode::SERVICE_UNAVAILABLE,
        };

        tracing::warn!("Request rejected ({}): {}", status.as_u16(), self);

        let body = json!({
            "status": "error",
            "error": self.code(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

async fn count_errors(
    Extension(relay): Extension<Arc<CameraRelay>>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if response.status().is_client_error() || response.status().is_server_error() {
        relay.record_error();
    }
    response
}

#[derive(Debug, Deserialize)]
struct SinceQuery {
    since: Option<u64>,
}

fn camera_id(raw: &str) -> Result<CameraId> {
    Ok(CameraId::parse(raw)?)
}

/// Decode an optional JSON body; an empty body yields the default.
fn optional_json<T>(body: &Bytes) -> Result<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| RelayError::InvalidPayload {
        reason: e.to_string(),
    })
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn heartbeat_handler(
    Extension(relay): Extension<Arc<CameraRelay>>,
    Path(raw): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let id = camera_id(&raw)?;
    relay.heartbeat(&id, Timestamp::now())?;
    Ok(Json(json!({ "status": "success", "camera_id": id })))
}

async fn register_handler(
    Extension(relay): Extension<Arc<CameraRelay>>,
    Path(raw): Path<String>,
    body: Bytes,
) -> Result<Json<serde_json::Value>> {
    let id = camera_id(&raw)?;
    let request: RegisterRequest = optional_json(&body)?;
    let registered = request.stream_url.is_some();
    relay.register(&id, request.stream_url, Timestamp::now())?;
    Ok(Json(json!({
        "status": "success",
        "camera_id": id,
        "stream_registered": registered,
    })))
}

async fn push_frame_handler(
    Extension(relay): Extension<Arc<CameraRelay>>,
    Path(raw): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>> {
    let id = camera_id(&raw)?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let frame = relay.push_frame(&id, body, content_type, Timestamp::now())?;
    Ok(Json(json!({
        "status": "success",
        "camera_id": id,
        "bytes": frame.payload.len(),
    })))
}

async fn camera_trigger_handler(
    Extension(relay): Extension<Arc<CameraRelay>>,
    Path(raw): Path<String>,
    body: Bytes,
) -> Result<Json<serde_json::Value>> {
    trigger(&relay, &raw, &body, AlarmSource::Camera)
}

async fn viewer_trigger_handler(
    Extension(relay): Extension<Arc<CameraRelay>>,
    Path(raw): Path<String>,
    body: Bytes,
) -> Result<Json<serde_json::Value>> {
    trigger(&relay, &raw, &body, AlarmSource::Viewer)
}

fn trigger(
    relay: &CameraRelay,
    raw: &str,
    body: &Bytes,
    source: AlarmSource,
) -> Result<Json<serde_json::Value>> {
    let id = camera_id(raw)?;
    let metadata: AlarmMetadata = optional_json(body)?;
    let event = relay.trigger_alarm(&id, metadata, Timestamp::now(), source)?;
    Ok(Json(json!({ "status": "success", "event": event })))
}

async fn camera_clear_handler(
    Extension(relay): Extension<Arc<CameraRelay>>,
    Path(raw): Path<String>,
) -> Result<Json<serde_json::Value>> {
    clear(&relay, &raw, AlarmSource::Camera)
}

async fn viewer_clear_handler(
    Extension(relay): Extension<Arc<CameraRelay>>,
    Path(raw): Path<String>,
) -> Result<Json<serde_json::Value>> {
    clear(&relay, &raw, AlarmSource::Viewer)
}

fn clear(relay: &CameraRelay, raw: &str, source: AlarmSource) -> Result<Json<serde_json::Value>> {
    let id = camera_id(raw)?;
    let cleared = relay.clear_alarm(&id, Timestamp::now(), source)?;
    Ok(Json(json!({
        "status": "success",
        "camera_id": id,
        "cleared": cleared,
    })))
}

/// Older viewer pages post to `/api/trigger_alarm_<id>` and
/// `/api/clear_alarm_<id>`. Anything else unmatched is a 404.
async fn legacy_alarm_handler(
    Extension(relay): Extension<Arc<CameraRelay>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Result<Response> {
    if method == Method::POST {
        let path = uri.path();
        if let Some(raw) = path.strip_prefix("/api/trigger_alarm_") {
            return trigger(&relay, raw, &body, AlarmSource::Viewer)
                .map(IntoResponse::into_response);
        }
        if let Some(raw) = path.strip_prefix("/api/clear_alarm_") {
            return clear(&relay, raw, AlarmSource::Viewer).map(IntoResponse::into_response);
        }
    }
    Ok(StatusCode::NOT_FOUND.into_response())
}

async fn clear_all_handler(
    Extension(relay): Extension<Arc<CameraRelay>>,
) -> Json<serde_json::Value> {
    let cleared = relay.clear_all_alarms(Timestamp::now());
    Json(json!({ "status": "success", "cleared": cleared }))
}

async fn video_feed_handler(
    Extension(relay): Extension<Arc<CameraRelay>>,
    Path(raw): Path<String>,
) -> Result<Response> {
    let id = camera_id(&raw)?;
    let subscription = relay.stream_frames(&id, Timestamp::now())?;
    tracing::info!(
        "Viewer attached to camera {} ({} watching)",
        id,
        relay.frames().viewer_count(&id)
    );

    let content_type = format!("multipart/x-mixed-replace; boundary={}", stream::BOUNDARY);
    let body = stream::multipart_body(relay.clone(), subscription);
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "no-cache".to_string()),
        ],
        body,
    )
        .into_response())
}

async fn snapshot_handler(
    Extension(relay): Extension<Arc<CameraRelay>>,
    Path(raw): Path<String>,
) -> Result<Response> {
    let id = camera_id(&raw)?;
    let view = relay.current_frame(&id, Timestamp::now())?;
    relay.record_frame_sent();

    let content_type = view
        .frame
        .content_type
        .clone()
        .unwrap_or_else(|| stream::DEFAULT_FRAME_TYPE.to_string());
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "no-store".to_string()),
            (X_CAMERA_STATE, view.state.as_str().to_string()),
            (X_FRAME_STALE, view.stale.to_string()),
            (X_FRAME_TIMESTAMP, view.frame.received_at.to_string()),
        ],
        view.frame.payload.clone(),
    )
        .into_response())
}

async fn poll_alarms_handler(
    Extension(relay): Extension<Arc<CameraRelay>>,
    Path(raw): Path<String>,
    Query(query): Query<SinceQuery>,
) -> Result<Json<AlarmPollResponse>> {
    let id = camera_id(&raw)?;
    let since = Sequence::new(query.since.unwrap_or(0));
    let events = relay.poll_alarms(&id, since, Timestamp::now())?;
    let latest_sequence = relay.latest_alarm_sequence(&id);
    Ok(Json(AlarmPollResponse {
        camera_id: id,
        since,
        events,
        latest_sequence,
    }))
}

async fn alarm_stream_handler(
    Extension(relay): Extension<Arc<CameraRelay>>,
    Path(raw): Path<String>,
    Query(query): Query<SinceQuery>,
    headers: HeaderMap,
) -> Result<Response> {
    let id = camera_id(&raw)?;
    // A reconnecting EventSource resumes from the last id it saw.
    let resume = headers
        .get(LAST_EVENT_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let since = resume.or(query.since).map(Sequence::new);

    let subscription = relay.stream_alarms(&id, since, Timestamp::now())?;
    tracing::debug!("Alarm stream opened for camera {} (since {:?})", id, since);
    Ok(stream::alarm_events(subscription).into_response())
}

async fn status_handler(Extension(relay): Extension<Arc<CameraRelay>>) -> Json<StatusSnapshot> {
    Json(relay.status().snapshot(Timestamp::now()))
}

async fn camera_streams_handler(
    Extension(relay): Extension<Arc<CameraRelay>>,
) -> Json<CameraStreamsResponse> {
    Json(relay.status().camera_streams(Timestamp::now()))
}

async fn alarm_status_handler(
    Extension(relay): Extension<Arc<CameraRelay>>,
) -> Json<AlarmStatusResponse> {
    Json(relay.status().alarm_status(Timestamp::now()))
}

async fn commands_handler(Extension(relay): Extension<Arc<CameraRelay>>) -> Json<CommandResponse> {
    Json(CommandResponse {
        command: relay.take_command().map(|c| c.to_string()),
    })
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>camlink relay</title></head>
<body>
<h1>camlink relay</h1>
<h2>Cameras</h2>
<ul>
<li>POST /camera/heartbeat/{id}</li>
<li>POST /camera/register/{id}</li>
<li>POST /camera/push_frame/{id}</li>
<li>POST /camera/trigger_alarm/{id}</li>
<li>POST /camera/clear_alarm/{id}</li>
</ul>
<h2>Viewers</h2>
<ul>
<li>GET /video_feed/{id}</li>
<li>GET /snapshot/{id}</li>
<li>GET /camera/alarms/{id}?since=N</li>
<li>GET /camera/alarms/{id}/stream?since=N</li>
<li>GET /status</li>
<li>GET /api/camera_streams</li>
<li>GET /api/alarm_status</li>
<li>GET /api/commands</li>
<li>POST /api/trigger_alarm/{id}</li>
<li>POST /api/clear_alarm/{id}</li>
<li>POST /api/clear_all_alarms</li>
</ul>
<h2>Operations</h2>
<ul>
<li>GET /health</li>
<li>GET /metrics</li>
</ul>
</body>
</html>
"#;
