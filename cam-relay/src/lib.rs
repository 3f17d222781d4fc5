//! # camlink-relay
//!
//! Camera relay server for camlink.
//!
//! Cameras sit behind NAT and cannot accept inbound connections, so they
//! push to the relay instead:
//! - heartbeats (and optional direct-stream registration)
//! - the latest video frame, replaced on every push
//! - sequenced alarm events
//!
//! Viewers read from the relay: live MJPEG-style streams, snapshots, alarm
//! polls and alarm event streams, plus an aggregated status view.
//!
//! ## Architecture
//!
//! ```text
//! Camera 1 ──┐                         ┌── Viewer (browser)
//!            │  POST heartbeat/frame   │
//! Camera 2 ──┼────────────────────────►│   GET video_feed/snapshot
//!            │                         │   GET alarms (poll / SSE)
//!        ┌───┴─────────────────────────┴───┐
//!        │          camlink-relay          │
//!        │  registry · frames · alarms     │
//!        │  (in memory, per camera)        │
//!        └─────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod alarms;
pub mod cleanup;
pub mod commands;
pub mod config;
pub mod error;
pub mod frames;
pub mod http;
pub mod limits;
pub mod registry;
pub mod server;
pub mod status;
