//! Health check endpoint.

use crate::server::CameraRelay;
use axum::{Extension, Json};
use cam_types::Timestamp;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Global start time for uptime calculation.
static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize the start time (call once at startup).
pub fn init_start_time() {
    START_TIME.get_or_init(Instant::now);
}

/// Health status response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Overall status.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Number of known cameras.
    pub cameras: usize,
    /// Number of cameras currently online.
    pub cameras_online: usize,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
}

/// Health check handler.
pub async fn health_handler(Extension(relay): Extension<Arc<CameraRelay>>) -> Json<HealthStatus> {
    let uptime = START_TIME
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0);

    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cameras: relay.registry().len(),
        cameras_online: relay.registry().online_count(Timestamp::now()),
        uptime_seconds: uptime,
    })
}
