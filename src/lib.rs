//! # airplay2
//!
//! An `AirPlay` 2 audio receiver that accepts a wireless audio stream from an
//! Apple-ecosystem source, decrypts and decodes it, performs frequency-domain
//! analysis on the samples, and emits timed light-show control frames to a
//! downstream DMX-style controller synchronized to the audio.
//!
//! ## Architecture
//!
//! - [`protocol`] — wire-level primitives: crypto, `HomeKit` pairing, binary
//!   property lists, RTP, and the RTSP control codec.
//! - [`frame`] — the decode → buffer → playback data path: [`frame::Frame`],
//!   [`frame::Reel`], [`frame::Racked`], and flush semantics.
//! - [`sync`] — the clock & anchor subsystem: a shared-memory bridge to the
//!   external PTP helper, and per-session RTP-to-local-time anchors.
//! - [`render`] — the frame-paced render loop, lighting-effect selection, and
//!   DMX frame production.
//! - [`dmx`] — the controller link: resolves and talks to the downstream DMX
//!   controller.
//! - [`discovery`] — the Service Advertiser: publishes `_airplay._tcp` and
//!   `_raop._tcp` records.
//! - [`receiver`] — the `AirPlay` 2 RTSP/session layer tying the above
//!   together into a running receiver.
//! - [`config`] — file- and CLI-backed configuration.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

/// File- and CLI-backed configuration.
pub mod config;
/// Error types.
pub mod error;
/// Shared wire-level types (RAOP TXT-record compatibility).
pub mod types;

/// Wire-level protocol implementations.
pub mod protocol;

/// Zeroconf advertisement (the Service Advertiser).
pub mod discovery;

/// The decode → buffer → playback data path.
pub mod frame;
/// The clock & anchor subsystem.
pub mod sync;
/// The render loop and lighting-effect selection.
pub mod render;
/// The DMX controller link.
pub mod dmx;
/// The observability sink counters and gauges are reported through.
pub mod stats;

/// The `AirPlay` 2 RTSP/session receiver.
pub mod receiver;

pub use error::AirPlayError;
pub use receiver::ap2::{AirPlay2Receiver, Ap2Config};
