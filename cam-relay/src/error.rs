//! Error types for cam-relay.

use cam_types::{CameraId, IdError};

/// Main error type for relay operations.
///
/// Every variant is scoped to the request that produced it. A failing
/// camera never surfaces as an error for a different camera.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Camera has never sent a heartbeat, registration, or (when
    /// auto-registration is on) a write.
    #[error("unknown camera: {camera}")]
    UnknownCamera {
        /// The camera that was not found.
        camera: CameraId,
    },

    /// Camera is known but its heartbeat is stale.
    #[error("camera offline: {camera}")]
    CameraOffline {
        /// The offline camera.
        camera: CameraId,
    },

    /// Camera is known but has never pushed a frame.
    #[error("no frame available for camera {camera}")]
    NoFrameAvailable {
        /// The camera without a frame.
        camera: CameraId,
    },

    /// Camera identifier failed validation.
    #[error("invalid camera id: {0}")]
    InvalidCameraId(#[from] IdError),

    /// Request body could not be decoded.
    #[error("invalid payload: {reason}")]
    InvalidPayload {
        /// Reason the payload is invalid.
        reason: String,
    },

    /// Frame push carried no bytes.
    #[error("empty frame for camera {camera}")]
    EmptyFrame {
        /// The pushing camera.
        camera: CameraId,
    },

    /// Frame exceeds the configured size limit.
    #[error("frame too large: {size} bytes (limit: {limit} bytes)")]
    PayloadTooLarge {
        /// Actual size of the frame.
        size: usize,
        /// Maximum allowed size.
        limit: usize,
    },

    /// Rate limit exceeded.
    #[error("rate limit exceeded: {reason}")]
    RateLimited {
        /// Reason for rate limiting.
        reason: String,
    },

    /// Camera already has the maximum number of streaming viewers.
    #[error("too many viewers for camera {camera} (limit: {limit})")]
    TooManyViewers {
        /// The camera being streamed.
        camera: CameraId,
        /// The viewer limit.
        limit: usize,
    },

    /// Registry is at capacity and cannot admit a new camera.
    #[error("camera registry full (limit: {limit})")]
    RegistryFull {
        /// Maximum number of cameras.
        limit: usize,
    },
}

impl RelayError {
    /// Short machine-readable code used in HTTP error bodies and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownCamera { .. } => "unknown_camera",
            Self::CameraOffline { .. } => "camera_offline",
            Self::NoFrameAvailable { .. } => "no_frame_available",
            Self::InvalidCameraId(_) => "invalid_camera_id",
            Self::InvalidPayload { .. } => "invalid_payload",
            Self::EmptyFrame { .. } => "empty_frame",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::RateLimited { .. } => "rate_limited",
            Self::TooManyViewers { .. } => "too_many_viewers",
            Self::RegistryFull { .. } => "registry_full",
        }
    }
}

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
