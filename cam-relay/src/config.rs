//! Configuration loading for cam-relay.
//!
//! Configuration is loaded from a TOML file (default: `relay.toml`).
//! Every field has a default, so an empty file is a valid configuration.

use cam_core::RetentionPolicy;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for cam-relay.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Camera registry configuration.
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Frame relay configuration.
    #[serde(default)]
    pub frames: FramesConfig,
    /// Alarm relay configuration.
    #[serde(default)]
    pub alarms: AlarmsConfig,
    /// Rate limiting configuration.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// HTTP endpoints configuration.
    #[serde(default)]
    pub http: HttpConfig,
    /// Cleanup task configuration.
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP server (default: 0.0.0.0:5000).
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

/// Camera registry configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Seconds without a heartbeat before a camera is offline (default: 30).
    #[serde(default = "default_liveness_timeout")]
    pub liveness_timeout_secs: u64,
    /// Create unknown cameras on their first frame push or alarm trigger
    /// (default: true). When false, cameras must heartbeat or register first.
    #[serde(default = "default_auto_register")]
    pub auto_register: bool,
    /// Maximum number of distinct cameras (default: 256).
    #[serde(default = "default_max_cameras")]
    pub max_cameras: usize,
}

/// Frame relay configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FramesConfig {
    /// Maximum frame size in bytes (default: 4MB).
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
    /// Seconds without a push before the current frame is flagged stale
    /// (default: 10).
    #[serde(default = "default_stale_after")]
    pub stale_after_secs: u64,
    /// Frames a slow viewer may fall behind before it skips ahead (default: 8).
    #[serde(default = "default_frame_stream_buffer")]
    pub stream_buffer: usize,
    /// Hold a new stream open until the first frame arrives instead of
    /// failing with "no frame available" (default: false).
    #[serde(default)]
    pub wait_for_first_frame: bool,
    /// Reject single-frame reads of offline cameras instead of serving the
    /// last frame flagged as stale (default: false).
    #[serde(default)]
    pub reject_offline_reads: bool,
    /// Maximum concurrent streaming viewers per camera (default: 64).
    #[serde(default = "default_max_viewers")]
    pub max_viewers_per_camera: usize,
}

/// Alarm relay configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AlarmsConfig {
    /// Maximum retained events per camera (default: 100).
    #[serde(default = "default_max_events")]
    pub max_events: usize,
    /// Maximum age of a retained event in seconds (default: 600).
    #[serde(default = "default_max_event_age")]
    pub max_age_secs: u64,
    /// Clear an active alarm once its camera has been silent this many
    /// seconds (default: 60, 0 disables).
    #[serde(default = "default_auto_clear_after")]
    pub auto_clear_after_secs: u64,
    /// Live events buffered per alarm subscriber (default: 64).
    #[serde(default = "default_alarm_stream_buffer")]
    pub stream_buffer: usize,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum camera write requests per camera per second (default: 60).
    #[serde(default = "default_camera_requests_per_second")]
    pub camera_requests_per_second: u32,
    /// Maximum camera write requests per second across all cameras
    /// (default: 2000).
    #[serde(default = "default_global_requests_per_second")]
    pub global_requests_per_second: u32,
}

/// HTTP endpoints configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Enable metrics endpoint (default: true).
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
    /// Allow cross-origin requests from browser viewers (default: true).
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
}

/// Cleanup task configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CleanupConfig {
    /// Sweep interval in seconds (default: 60).
    #[serde(default = "default_cleanup_interval")]
    pub interval_secs: u64,
    /// Enable cleanup task (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_liveness_timeout() -> u64 {
    30
}

fn default_auto_register() -> bool {
    true
}

fn default_max_cameras() -> usize {
    256
}

fn default_max_frame_bytes() -> usize {
    4 * 1024 * 1024 // 4MB
}

fn default_stale_after() -> u64 {
    10
}

fn default_frame_stream_buffer() -> usize {
    8
}

fn default_max_viewers() -> usize {
    64
}

fn default_max_events() -> usize {
    100
}

fn default_max_event_age() -> u64 {
    10 * 60 // 10 minutes
}

fn default_auto_clear_after() -> u64 {
    60
}

fn default_alarm_stream_buffer() -> usize {
    64
}

fn default_camera_requests_per_second() -> u32 {
    60
}

fn default_global_requests_per_second() -> u32 {
    2000
}

fn default_cleanup_interval() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            liveness_timeout_secs: default_liveness_timeout(),
            auto_register: default_auto_register(),
            max_cameras: default_max_cameras(),
        }
    }
}

impl Default for FramesConfig {
    fn default() -> Self {
        Self {
            max_frame_bytes: default_max_frame_bytes(),
            stale_after_secs: default_stale_after(),
            stream_buffer: default_frame_stream_buffer(),
            wait_for_first_frame: false,
            reject_offline_reads: false,
            max_viewers_per_camera: default_max_viewers(),
        }
    }
}

impl Default for AlarmsConfig {
    fn default() -> Self {
        Self {
            max_events: default_max_events(),
            max_age_secs: default_max_event_age(),
            auto_clear_after_secs: default_auto_clear_after(),
            stream_buffer: default_alarm_stream_buffer(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            camera_requests_per_second: default_camera_requests_per_second(),
            global_requests_per_second: default_global_requests_per_second(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            cors_enabled: true,
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_cleanup_interval(),
            enabled: true,
        }
    }
}

impl RegistryConfig {
    /// Heartbeat timeout as a Duration.
    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_secs(self.liveness_timeout_secs)
    }
}

impl FramesConfig {
    /// Push-staleness threshold as a Duration.
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}

impl AlarmsConfig {
    /// Retention policy for per-camera alarm logs.
    pub fn retention(&self) -> RetentionPolicy {
        RetentionPolicy {
            max_events: self.max_events,
            max_age: Duration::from_secs(self.max_age_secs),
        }
    }

    /// Auto-clear threshold, `None` when disabled.
    pub fn auto_clear_after(&self) -> Option<Duration> {
        (self.auto_clear_after_secs > 0).then(|| Duration::from_secs(self.auto_clear_after_secs))
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails
    /// validation.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that have no sensible zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks: [(&'static str, bool); 7] = [
            ("registry.liveness_timeout_secs", self.registry.liveness_timeout_secs > 0),
            ("registry.max_cameras", self.registry.max_cameras > 0),
            ("frames.max_frame_bytes", self.frames.max_frame_bytes > 0),
            ("frames.stream_buffer", self.frames.stream_buffer > 0),
            ("alarms.max_events", self.alarms.max_events > 0),
            ("limits.camera_requests_per_second", self.limits.camera_requests_per_second > 0),
            ("limits.global_requests_per_second", self.limits.global_requests_per_second > 0),
        ];
        match checks.iter().find(|(_, ok)| !ok) {
            Some((field, _)) => Err(ConfigError::Invalid { field: *field }),
            None => Ok(()),
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// A field holds a value the relay cannot run with.
    #[error("invalid config value: {field} must be greater than zero")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.server.bind_address, "0.0.0.0:5000");
        assert_eq!(config.registry.liveness_timeout_secs, 30);
        assert!(config.registry.auto_register);
        assert_eq!(config.frames.max_frame_bytes, 4 * 1024 * 1024);
        assert_eq!(config.alarms.max_events, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[server]
bind_address = "127.0.0.1:8080"

[registry]
liveness_timeout_secs = 15
auto_register = false

[frames]
max_frame_bytes = 1048576
wait_for_first_frame = true

[alarms]
max_events = 20
max_age_secs = 120

[limits]
camera_requests_per_second = 30

[http]
cors_enabled = false

[cleanup]
interval_secs = 5
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:8080");
        assert_eq!(config.registry.liveness_timeout(), Duration::from_secs(15));
        assert!(!config.registry.auto_register);
        assert_eq!(config.frames.max_frame_bytes, 1048576);
        assert!(config.frames.wait_for_first_frame);
        assert_eq!(config.alarms.retention().max_events, 20);
        assert_eq!(config.alarms.retention().max_age, Duration::from_secs(120));
        assert_eq!(config.limits.camera_requests_per_second, 30);
        assert!(!config.http.cors_enabled);
        assert!(config.http.metrics_enabled);
        assert_eq!(config.cleanup.interval_secs, 5);
    }

    #[test]
    fn config_missing_sections_use_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.frames.stale_after(), Duration::from_secs(10));
        assert_eq!(config.alarms.auto_clear_after(), Some(Duration::from_secs(60)));
        assert_eq!(config.limits.global_requests_per_second, 2000);
        assert!(config.cleanup.enabled);
    }

    #[test]
    fn auto_clear_zero_disables() {
        let config: Config = toml::from_str("[alarms]\nauto_clear_after_secs = 0\n").unwrap();
        assert_eq!(config.alarms.auto_clear_after(), None);
    }

    #[test]
    fn validate_rejects_zero_limits() {
        let config: Config =
            toml::from_str("[limits]\ncamera_requests_per_second = 0\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "limits.camera_requests_per_second"
            }
        ));
    }

    #[test]
    fn from_file_reads_and_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[registry]\nmax_cameras = 4").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.registry.max_cameras, 4);

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        writeln!(bad, "[registry]\nmax_cameras = 0").unwrap();
        assert!(matches!(
            Config::from_file(bad.path()),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn from_file_reports_missing_and_malformed() {
        let missing = Config::from_file(std::path::Path::new("/nonexistent/relay.toml"));
        assert!(matches!(missing, Err(ConfigError::ReadError { .. })));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[registry\nmax_cameras = ").unwrap();
        assert!(matches!(
            Config::from_file(file.path()),
            Err(ConfigError::ParseError { .. })
        ));
    }
}
