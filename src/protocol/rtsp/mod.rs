//! Sans-IO RTSP protocol implementation for AirPlay

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod request;
pub mod response;
pub mod server_codec;
pub mod headers;

pub use request::{RtspRequest, RtspRequestBuilder};
pub use response::{RtspResponse, StatusCode};
pub use server_codec::{ParseError, RtspServerCodec};
pub use headers::Headers;

/// RTSP/HTTP methods used by an `AirPlay` 2 source over the control connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Initiate session options negotiation
    Options,
    /// Continue an in-progress multi-step exchange
    Continue,
    /// HTTP GET (used for `/info` and similar endpoints)
    Get,
    /// HTTP POST (used for pairing, command, and feedback endpoints)
    Post,
    /// Set up transport and session
    Setup,
    /// Start recording/streaming
    Record,
    /// Pause playback
    Pause,
    /// Flush buffers up to the currently playing position
    Flush,
    /// Discard buffered frames within explicit sequence/timestamp bounds
    FlushBuffered,
    /// Tear down session
    Teardown,
    /// Set parameter (volume, progress, etc.)
    SetParameter,
    /// Get parameter (playback info, etc.)
    GetParameter,
    /// Register this host as a timing peer (flat address list)
    SetPeers,
    /// Register this host as a timing peer (per-peer address groups)
    SetPeersX,
    /// Install a new RTP-timestamp-to-network-time anchor
    SetRateAnchorTime,
    /// Out-of-band status feedback
    Feedback,
}

impl Method {
    /// Convert to RTSP method string
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Options => "OPTIONS",
            Method::Continue => "CONTINUE",
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Setup => "SETUP",
            Method::Record => "RECORD",
            Method::Pause => "PAUSE",
            Method::Flush => "FLUSH",
            Method::FlushBuffered => "FLUSHBUFFERED",
            Method::Teardown => "TEARDOWN",
            Method::SetParameter => "SET_PARAMETER",
            Method::GetParameter => "GET_PARAMETER",
            Method::SetPeers => "SETPEERS",
            Method::SetPeersX => "SETPEERSX",
            Method::SetRateAnchorTime => "SETRATEANCHORTIME",
            Method::Feedback => "FEEDBACK",
        }
    }

    /// Parse from string
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "OPTIONS" => Some(Method::Options),
            "CONTINUE" => Some(Method::Continue),
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            "SETUP" => Some(Method::Setup),
            "RECORD" => Some(Method::Record),
            "PAUSE" => Some(Method::Pause),
            "FLUSH" => Some(Method::Flush),
            "FLUSHBUFFERED" => Some(Method::FlushBuffered),
            "TEARDOWN" => Some(Method::Teardown),
            "SET_PARAMETER" => Some(Method::SetParameter),
            "GET_PARAMETER" => Some(Method::GetParameter),
            "SETPEERS" => Some(Method::SetPeers),
            "SETPEERSX" => Some(Method::SetPeersX),
            "SETRATEANCHORTIME" => Some(Method::SetRateAnchorTime),
            "FEEDBACK" => Some(Method::Feedback),
            _ => None,
        }
    }
}
