//! # cam-core
//!
//! Pure logic for camlink (no I/O, instant tests).
//!
//! The relay keeps two kinds of time-dependent state: camera liveness and
//! the recent-alarm buffer. Both are implemented here as plain functions and
//! data structures that take the current [`Timestamp`] as an argument, so
//! every rule can be tested against a synthetic clock without a runtime.
//!
//! The actual I/O (HTTP, locking, fan-out) is performed by `cam-relay`.
//!
//! [`Timestamp`]: cam_types::Timestamp

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod alarm_log;
pub mod liveness;

pub use alarm_log::{AlarmLog, RetentionPolicy};
pub use liveness::Liveness;
