//! Unified request handler for `AirPlay` 2 receiver
//!
//! Routes requests to appropriate handlers based on classification,
//! manages session state, and handles encryption/decryption.

use std::net::IpAddr;

use super::request_router::{Ap2Endpoint, Ap2RequestType, RtspMethod};
use super::response_builder::Ap2ResponseBuilder;
use super::session_state::Ap2SessionState;
use super::stream::{AudioStreamFormat, EncryptionType, TimingPeerInfo, TimingProtocol};
use crate::frame::FlushInfo;
use crate::protocol::rtsp::{RtspRequest, StatusCode};

/// Result of handling a request
#[derive(Debug)]
pub struct Ap2HandleResult {
    /// Response bytes to send
    pub response: Vec<u8>,

    /// New session state (if changed)
    pub new_state: Option<Ap2SessionState>,

    /// Event to emit (for audio pipeline control)
    pub event: Option<Ap2Event>,

    /// Error that occurred (for logging)
    pub error: Option<String>,
}

/// Events emitted by request handling
#[derive(Debug, Clone)]
pub enum Ap2Event {
    /// Pairing completed, session keys available
    PairingComplete {
        /// Key for encrypting messages to the client.
        encrypt_key: [u8; 32],
        /// Key for decrypting messages from the client.
        decrypt_key: [u8; 32],
    },

    /// First SETUP phase complete, timing/event channels ready
    SetupPhase1Complete {
        /// UDP port for timing synchronization
        timing_port: u16,
        /// UDP port for event channel
        event_port: u16,
        /// Timing peer info supplied by the source, if any (PTP group).
        timing_peer_info: Option<TimingPeerInfo>,
        /// Negotiated timing protocol.
        timing_protocol: TimingProtocol,
    },

    /// Second SETUP phase complete, audio channels ready
    SetupPhase2Complete {
        /// UDP port for audio data
        audio_data_port: u16,
        /// UDP port for audio control
        audio_control_port: u16,
        /// Negotiated audio format, if the source described one.
        audio_format: Option<AudioStreamFormat>,
        /// Negotiated encryption type for the audio stream.
        encryption_type: EncryptionType,
        /// Shared encryption key, if provided inline.
        shared_key: Option<Vec<u8>>,
    },

    /// Streaming started
    StreamingStarted {
        /// Initial sequence number
        initial_sequence: u16,
        /// Initial RTP timestamp
        initial_timestamp: u32,
    },

    /// Streaming paused
    StreamingPaused,

    /// Buffer flush requested (FLUSH)
    FlushRequested {
        /// Sequence number to flush until
        until_sequence: Option<u16>,
        /// Timestamp to flush until
        until_timestamp: Option<u32>,
    },

    /// Bounded buffer flush requested (FLUSHBUFFERED)
    FlushBufferedRequested {
        /// Bounds to submit to Racked.
        flush_info: FlushInfo,
    },

    /// SETPEERS/SETPEERSX: the source registered this host's timing peers.
    TimingPeersUpdated {
        /// Flat list of peer addresses to publish to the clock bridge.
        peers: Vec<IpAddr>,
    },

    /// SETRATEANCHORTIME: a new RTP-to-network-time anchor was installed.
    AnchorInstalled {
        /// RTP timestamp the anchor is pinned to.
        rtp_time: u32,
        /// Source-clock nanoseconds at `rtp_time`.
        network_time_ns: u64,
        /// Source clock identifier.
        clock_id: u64,
        /// Rate field; bit 0 enables spooling into Racked.
        rate: u32,
    },

    /// Session teardown
    Teardown,

    /// Volume changed
    VolumeChanged {
        /// New volume level (dB)
        volume: f32,
    },

    /// Metadata updated
    MetadataUpdated,
}

/// Type alias for decryption function
pub type Decryptor = dyn Fn(&[u8]) -> Result<Vec<u8>, String>;

/// Context for request handling
pub struct Ap2RequestContext<'a> {
    /// Current session state
    pub state: &'a Ap2SessionState,

    /// Session ID (if established)
    pub session_id: Option<&'a str>,

    /// Encryption enabled
    pub encrypted: bool,

    /// Decryption function (if encrypted)
    pub decrypt: Option<&'a Decryptor>,
}

/// Handle an `AirPlay` 2 request
#[must_use]
pub fn handle_ap2_request(
    request: &RtspRequest,
    context: &Ap2RequestContext,
    handlers: &Ap2Handlers,
) -> Ap2HandleResult {
    let cseq = request.headers.cseq().unwrap_or(0);
    let request_type = Ap2RequestType::classify(request);

    // Check if request is allowed in current state
    if !context.state.allows_method(request.method.as_str()) {
        return Ap2HandleResult {
            response: Ap2ResponseBuilder::error(StatusCode::METHOD_NOT_VALID)
                .cseq(cseq)
                .encode(),
            new_state: None,
            event: None,
            error: Some(format!(
                "Method {} not allowed in state {:?}",
                request.method.as_str(),
                context.state
            )),
        };
    }

    // Check authentication requirements
    if let Ap2RequestType::Endpoint(ref endpoint) = request_type {
        if endpoint.requires_auth() && !context.state.is_authenticated() {
            return Ap2HandleResult {
                response: Ap2ResponseBuilder::auth_required(cseq).encode(),
                new_state: None,
                event: None,
                error: Some("Authentication required".to_string()),
            };
        }
    }

    // Route to appropriate handler
    match request_type {
        Ap2RequestType::Rtsp(method) => {
            handle_rtsp_method(method, request, cseq, context, handlers)
        }
        Ap2RequestType::Endpoint(endpoint) => {
            handle_endpoint(endpoint, request, cseq, context, handlers)
        }
        Ap2RequestType::Unknown => Ap2HandleResult {
            response: Ap2ResponseBuilder::error(StatusCode::NOT_IMPLEMENTED)
                .cseq(cseq)
                .encode(),
            new_state: None,
            event: None,
            error: Some("Unknown request type".to_string()),
        },
    }
}

fn handle_rtsp_method(
    method: RtspMethod,
    request: &RtspRequest,
    cseq: u32,
    context: &Ap2RequestContext,
    handlers: &Ap2Handlers,
) -> Ap2HandleResult {
    match method {
        RtspMethod::Options => handle_options(cseq),
        RtspMethod::Setup => (handlers.setup)(request, cseq, context),
        RtspMethod::Record => (handlers.record)(request, cseq, context),
        RtspMethod::Pause => (handlers.pause)(request, cseq, context),
        RtspMethod::Flush => (handlers.flush)(request, cseq, context),
        RtspMethod::Teardown => (handlers.teardown)(request, cseq, context),
        RtspMethod::GetParameter => (handlers.get_parameter)(request, cseq, context),
        RtspMethod::SetParameter => (handlers.set_parameter)(request, cseq, context),
        RtspMethod::FlushBuffered => (handlers.flush_buffered)(request, cseq, context),
        RtspMethod::SetPeers => (handlers.set_peers)(request, cseq, context),
        RtspMethod::SetPeersX => (handlers.set_peers)(request, cseq, context),
        RtspMethod::SetRateAnchorTime => (handlers.set_rate_anchor_time)(request, cseq, context),
        RtspMethod::Continue => Ap2HandleResult {
            response: Ap2ResponseBuilder::ok().cseq(cseq).encode(),
            new_state: None,
            event: None,
            error: None,
        },
        RtspMethod::Get => {
            // GET /info is handled as endpoint
            Ap2HandleResult {
                response: Ap2ResponseBuilder::error(StatusCode::NOT_FOUND)
                    .cseq(cseq)
                    .encode(),
                new_state: None,
                event: None,
                error: None,
            }
        }
    }
}

fn handle_endpoint(
    endpoint: Ap2Endpoint,
    request: &RtspRequest,
    cseq: u32,
    context: &Ap2RequestContext,
    handlers: &Ap2Handlers,
) -> Ap2HandleResult {
    match endpoint {
        Ap2Endpoint::Info => (handlers.info)(request, cseq, context),
        Ap2Endpoint::PairSetup => (handlers.pair_setup)(request, cseq, context),
        Ap2Endpoint::PairVerify => (handlers.pair_verify)(request, cseq, context),
        Ap2Endpoint::Command => (handlers.command)(request, cseq, context),
        Ap2Endpoint::Feedback => (handlers.feedback)(request, cseq, context),
        Ap2Endpoint::AudioMode => (handlers.audio_mode)(request, cseq, context),
        Ap2Endpoint::AuthSetup => (handlers.auth_setup)(request, cseq, context),

        Ap2Endpoint::FairPlaySetup => {
            // spec.md §4.3: opaque FairPlay challenge/response, handled by
            // the pairing library and returned as an octet-stream 200. The
            // actual FairPlay key material is proprietary and out of scope
            // (spec.md §1 names only the HomeKit/SRP pairing library as an
            // in-scope external collaborator); this echoes the request body
            // back as the opaque reply so legacy probes get the expected
            // 200-with-octet-stream shape rather than a 501.
            Ap2HandleResult {
                response: Ap2ResponseBuilder::ok()
                    .cseq(cseq)
                    .binary_body(request.body.clone())
                    .encode(),
                new_state: None,
                event: None,
                error: None,
            }
        }

        Ap2Endpoint::Unknown(path) => {
            tracing::warn!("Unknown endpoint: {}", path);
            Ap2HandleResult {
                response: Ap2ResponseBuilder::error(StatusCode::NOT_FOUND)
                    .cseq(cseq)
                    .encode(),
                new_state: None,
                event: None,
                error: Some(format!("Unknown endpoint: {path}")),
            }
        }
    }
}

fn handle_options(cseq: u32) -> Ap2HandleResult {
    let methods = [
        "ANNOUNCE",
        "SETUP",
        "RECORD",
        "PAUSE",
        "FLUSH",
        "FLUSHBUFFERED",
        "TEARDOWN",
        "OPTIONS",
        "POST",
        "GET",
        "PUT",
    ]
    .join(", ");

    Ap2HandleResult {
        response: Ap2ResponseBuilder::ok()
            .cseq(cseq)
            .header("Public", &methods)
            .server("AirPierre")
            .encode(),
        new_state: None,
        event: None,
        error: None,
    }
}

/// Handler function type
pub type HandlerFn =
    Box<dyn Fn(&RtspRequest, u32, &Ap2RequestContext) -> Ap2HandleResult + Send + Sync>;

/// Collection of request handlers
pub struct Ap2Handlers {
    /// Handler for `/info` endpoint
    pub info: HandlerFn,
    /// Handler for `/pair-setup` endpoint
    pub pair_setup: HandlerFn,
    /// Handler for `/pair-verify` endpoint
    pub pair_verify: HandlerFn,
    /// Handler for `/auth-setup` endpoint
    pub auth_setup: HandlerFn,
    /// Handler for `SETUP` method
    pub setup: HandlerFn,
    /// Handler for `RECORD` method
    pub record: HandlerFn,
    /// Handler for `PAUSE` method
    pub pause: HandlerFn,
    /// Handler for `FLUSH` method
    pub flush: HandlerFn,
    /// Handler for `TEARDOWN` method
    pub teardown: HandlerFn,
    /// Handler for `GET_PARAMETER` method
    pub get_parameter: HandlerFn,
    /// Handler for `SET_PARAMETER` method
    pub set_parameter: HandlerFn,
    /// Handler for `/command` endpoint
    pub command: HandlerFn,
    /// Handler for `/feedback` endpoint
    pub feedback: HandlerFn,
    /// Handler for `/audioMode` endpoint
    pub audio_mode: HandlerFn,
    /// Handler for `FLUSHBUFFERED` method
    pub flush_buffered: HandlerFn,
    /// Handler for `SETPEERS`/`SETPEERSX` methods
    pub set_peers: HandlerFn,
    /// Handler for `SETRATEANCHORTIME` method
    pub set_rate_anchor_time: HandlerFn,
}

impl Default for Ap2Handlers {
    fn default() -> Self {
        Self {
            info: Box::new(stub_handler),
            pair_setup: Box::new(stub_handler),
            pair_verify: Box::new(stub_handler),
            auth_setup: Box::new(stub_handler),
            setup: Box::new(stub_handler),
            record: Box::new(stub_handler),
            pause: Box::new(stub_handler),
            flush: Box::new(stub_handler),
            teardown: Box::new(stub_handler),
            get_parameter: Box::new(stub_handler),
            set_parameter: Box::new(stub_handler),
            command: Box::new(stub_handler),
            feedback: Box::new(stub_handler),
            audio_mode: Box::new(stub_handler),
            flush_buffered: Box::new(stub_handler),
            set_peers: Box::new(stub_handler),
            set_rate_anchor_time: Box::new(stub_handler),
        }
    }
}

/// Stub handler for unimplemented endpoints
fn stub_handler(
    _request: &RtspRequest,
    cseq: u32,
    _context: &Ap2RequestContext,
) -> Ap2HandleResult {
    Ap2HandleResult {
        response: Ap2ResponseBuilder::error(StatusCode::NOT_IMPLEMENTED)
            .cseq(cseq)
            .encode(),
        new_state: None,
        event: None,
        error: Some("Handler not implemented".to_string()),
    }
}
