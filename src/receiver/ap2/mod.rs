//! `AirPlay` 2 Receiver Components
//!
//! This module contains the RTSP control-channel side of the `AirPlay` 2
//! receiver: pairing, request routing/dispatch, session state, and the RTP
//! decrypt step that hands decoded audio off to [`crate::frame`].

/// Zeroconf advertisement helpers specific to the AP2 TXT key set
pub mod advertisement;
/// Plist/body parsing helpers shared by endpoint handlers
pub mod body_handler;
/// Feature-bitmap and capability negotiation
pub mod capabilities;
/// Command endpoint handler
pub mod command_handler;
/// Configuration types
pub mod config;
/// RECORD/GET_PARAMETER/SET_PARAMETER/TEARDOWN handling
pub mod control_handlers;
/// Encrypted channel handling
pub mod encrypted_channel;
/// Encrypted RTSP read/write loop
pub mod encrypted_rtsp;
/// Feature-bit constants
pub mod features;
/// Info endpoint handler
pub mod info_endpoint;
/// Pairing endpoint handlers (`/pair-setup`, `/pair-verify`)
pub mod pairing_handlers;
/// Pairing server implementation
pub mod pairing_server;
/// Main receiver implementation
pub mod receiver;
/// Request dispatch
pub mod request_handler;
/// Request routing/classification
pub mod request_router;
/// RTSP response builder
pub mod response_builder;
/// RTSP protocol-debugging capture-to-disk sink
pub mod rtsp_saver;
/// Composition root: handler wiring and the per-connection session loop
pub mod session;
/// Per-connection remote-control identity, group membership, and idle-timeout clock
pub mod session_context;
/// Session state machine
pub mod session_state;
/// Setup handler
pub mod setup_handler;
/// Stream descriptor parsing
pub mod stream;
/// SETPEERS/SETPEERSX/SETRATEANCHORTIME/FLUSHBUFFERED handling
pub mod timing_handler;

// Re-exports
pub use config::Ap2Config;
pub use info_endpoint::InfoEndpoint;
pub use pairing_server::PairingServer;
pub use receiver::AirPlay2Receiver;
pub use request_router::{Ap2Endpoint, Ap2RequestType, RtspMethod};
pub use session_context::SessionContext;
pub use session_state::Ap2SessionState;
pub use stream::StreamDescriptor;

#[cfg(test)]
mod tests;
