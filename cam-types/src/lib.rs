//! # cam-types
//!
//! Wire format types for the camlink camera relay.
//!
//! This crate provides the foundational types used across all camlink crates:
//! - [`CameraId`], [`Sequence`], [`Timestamp`] - Identity and ordering types
//! - [`AlarmEvent`], [`AlarmMetadata`] - Alarm events relayed to viewers
//! - [`LiveState`] - Derived camera liveness
//! - [`StatusSnapshot`] and friends - JSON bodies served to viewers
//! - [`IdError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod messages;

pub use error::IdError;
pub use ids::{CameraId, Sequence, Timestamp};
pub use messages::{
    AlarmEvent, AlarmMetadata, AlarmPollResponse, AlarmStatus, AlarmStatusResponse,
    CameraStatus, CameraStreamsResponse, CommandResponse, LiveState, RegisterRequest,
    StatusSnapshot,
};
