//! Background maintenance task.
//!
//! Runs the relay sweep periodically: logs liveness transitions, expires old
//! alarm events, auto-clears alarms of silent cameras and shrinks
//! rate-limiter state.

use crate::config::CleanupConfig;
use crate::server::CameraRelay;
use cam_types::Timestamp;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

/// Spawn a background cleanup task.
///
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_task(
    relay: Arc<CameraRelay>,
    config: CleanupConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if !config.enabled {
            tracing::info!("Cleanup task disabled");
            return;
        }

        let interval_secs = config.interval_secs.max(1);
        tracing::info!("Cleanup task started (interval: {}s)", interval_secs);

        let mut timer = interval(Duration::from_secs(interval_secs));

        loop {
            timer.tick().await;

            let report = relay.sweep(Timestamp::now());
            if report.alarms_expired > 0 || !report.alarms_auto_cleared.is_empty() {
                tracing::info!(
                    "Cleanup: expired {} alarm events, auto-cleared {} alarms",
                    report.alarms_expired,
                    report.alarms_auto_cleared.len()
                );
            } else {
                tracing::debug!(
                    "Cleanup: {} cameras, {} online",
                    relay.registry().len(),
                    relay.registry().online_count(Timestamp::now())
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::server::AlarmSource;
    use cam_types::{AlarmMetadata, CameraId};

    #[tokio::test]
    async fn cleanup_task_auto_clears_silent_alarms() {
        let relay = Arc::new(CameraRelay::new(Config::default()));
        let camera = CameraId::from(1u32);
        // Seen long ago, so the first sweep treats it as silent.
        relay
            .trigger_alarm(
                &camera,
                AlarmMetadata::default(),
                Timestamp::from_secs(1),
                AlarmSource::Camera,
            )
            .unwrap();

        let handle = spawn_cleanup_task(
            relay.clone(),
            CleanupConfig {
                interval_secs: 60,
                enabled: true,
            },
        );

        let cleared = tokio::time::timeout(Duration::from_secs(2), async {
            while relay.alarms().status(&camera).is_some_and(|s| s.active) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        handle.abort();

        assert!(cleared.is_ok(), "first sweep should clear the alarm");
    }

    #[tokio::test]
    async fn cleanup_task_disabled() {
        let relay = Arc::new(CameraRelay::new(Config::default()));
        let config = CleanupConfig {
            interval_secs: 1,
            enabled: false,
        };

        let handle = spawn_cleanup_task(relay, config);

        // Task should complete immediately when disabled
        tokio::time::timeout(Duration::from_millis(100), handle)
            .await
            .expect("Task should complete when disabled")
            .expect("Task should not panic");
    }
}
