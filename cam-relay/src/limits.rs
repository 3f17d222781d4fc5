//! Rate limiting for camlink-relay.
//!
//! Camera writes (heartbeats, frames, alarms) are limited per camera id so a
//! misbehaving camera cannot starve the others. A global limiter caps the
//! aggregate write rate across all cameras.
//!
//! Both use the governor crate; the keyed limiter is backed by DashMap.

use crate::config::LimitsConfig;
use cam_types::CameraId;
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Type alias for a keyed rate limiter using DashMap.
type KeyedLimiter<K> = RateLimiter<
    K,
    dashmap::DashMap<K, InMemoryState>,
    DefaultClock,
    NoOpMiddleware<governor::clock::QuantaInstant>,
>;

/// Type alias for a direct (non-keyed) rate limiter.
type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate limiters for the relay server.
#[derive(Clone)]
pub struct RateLimits {
    /// Limits write requests per camera.
    camera_limiter: Arc<KeyedLimiter<CameraId>>,

    /// Aggregate write limit across all cameras.
    global_limiter: Arc<DirectLimiter>,
}

impl std::fmt::Debug for RateLimits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimits")
            .field("camera_limiter", &"KeyedLimiter<CameraId>")
            .field("global_limiter", &"DirectLimiter")
            .finish()
    }
}

impl RateLimits {
    /// Create rate limiters from configuration.
    ///
    /// Zero rates are rejected by `Config::validate`; if one slips through it
    /// is treated as one request per second.
    pub fn new(config: &LimitsConfig) -> Self {
        let per_camera =
            NonZeroU32::new(config.camera_requests_per_second).unwrap_or(NonZeroU32::MIN);
        let global = NonZeroU32::new(config.global_requests_per_second).unwrap_or(NonZeroU32::MIN);

        Self {
            camera_limiter: Arc::new(RateLimiter::keyed(Quota::per_second(per_camera))),
            global_limiter: Arc::new(RateLimiter::direct(Quota::per_second(global))),
        }
    }

    /// Check if a write from `camera_id` is allowed.
    pub fn check_camera(&self, camera_id: &CameraId) -> Result<(), RateLimitError> {
        self.camera_limiter
            .check_key(camera_id)
            .map_err(|_| RateLimitError::CameraLimitExceeded)
    }

    /// Check if the global request rate is within limits.
    pub fn check_global(&self) -> Result<(), RateLimitError> {
        self.global_limiter
            .check()
            .map_err(|_| RateLimitError::GlobalLimitExceeded)
    }

    /// Number of cameras tracked by the keyed limiter (for metrics).
    pub fn camera_keys_count(&self) -> usize {
        self.camera_limiter.len()
    }

    /// Evict idle cameras from the keyed limiter. Called from the cleanup task.
    pub fn shrink(&self) {
        self.camera_limiter.retain_recent();
    }
}

/// Rate limit error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitError {
    /// Too many writes from this camera.
    CameraLimitExceeded,
    /// Global request rate exceeded across all cameras.
    GlobalLimitExceeded,
}

impl std::fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CameraLimitExceeded => write!(f, "camera rate limit exceeded"),
            Self::GlobalLimitExceeded => write!(f, "global rate limit exceeded"),
        }
    }
}

impl std::error::Error for RateLimitError {}
