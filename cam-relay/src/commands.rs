//! Latest viewer command, polled by dashboards.
//!
//! A single slot: every alarm trigger or clear overwrites it and
//! [`CommandSlot::take`] returns and empties it.

use cam_types::CameraId;
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// A command published to polling dashboards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// An alarm was raised on a camera.
    TriggerAlarm(CameraId),
    /// A camera's alarm was cleared.
    ClearAlarm(CameraId),
    /// Every alarm was cleared.
    ClearAllAlarms,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TriggerAlarm(id) => write!(f, "trigger_alarm_{id}"),
            Self::ClearAlarm(id) => write!(f, "clear_alarm_{id}"),
            Self::ClearAllAlarms => f.write_str("clear_all_alarms"),
        }
    }
}

/// Holds at most one pending command.
#[derive(Debug, Default)]
pub struct CommandSlot {
    latest: Mutex<Option<Command>>,
}

impl CommandSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the pending command.
    pub fn set(&self, command: Command) {
        tracing::debug!("Command set: {}", command);
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(command);
    }

    /// Return the pending command and clear the slot.
    pub fn take(&self) -> Option<Command> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Look at the pending command without clearing it.
    pub fn peek(&self) -> Option<Command> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
