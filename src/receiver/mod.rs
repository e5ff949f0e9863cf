//! Receiver implementation for `AirPlay`
//!
//! This module contains the server-side logic for accepting `AirPlay` 2
//! sessions: pairing, RTSP dispatch, and the composition root that wires the
//! decode/buffer/render/DMX pipeline together.

/// `AirPlay` 2 session handling (pairing, RTSP dispatch, composition root).
pub mod ap2;

pub use ap2::{AirPlay2Receiver, Ap2Config, InfoEndpoint, PairingServer};
