//! SETPEERS, SETPEERSX, SETRATEANCHORTIME, and FLUSHBUFFERED handling.
//!
//! These four RTSP methods all carry a binary plist body and act directly on
//! the clock/anchor/rack subsystem rather than the session state machine, so
//! they're grouped separately from [`super::setup_handler`].

use std::net::IpAddr;

use tracing::warn;

use super::body_handler::parse_bplist_body;
use super::request_handler::{Ap2Event, Ap2HandleResult, Ap2RequestContext};
use super::response_builder::Ap2ResponseBuilder;
use crate::frame::{FlushInfo, FlushKind};
use crate::protocol::plist::PlistValue;
use crate::protocol::rtsp::{RtspRequest, StatusCode};

fn ok(cseq: u32, event: Ap2Event) -> Ap2HandleResult {
    Ap2HandleResult {
        response: Ap2ResponseBuilder::ok().cseq(cseq).encode(),
        new_state: None,
        event: Some(event),
        error: None,
    }
}

fn bad_request(cseq: u32, message: impl Into<String>) -> Ap2HandleResult {
    Ap2HandleResult {
        response: Ap2ResponseBuilder::error(StatusCode::BAD_REQUEST)
            .cseq(cseq)
            .encode(),
        new_state: None,
        event: None,
        error: Some(message.into()),
    }
}

fn as_i64(value: &PlistValue) -> Option<i64> {
    match value {
        PlistValue::Integer(i) => Some(*i),
        _ => None,
    }
}

/// Handle SETPEERS (flat address array) and SETPEERSX (nested
/// `{ID, Addresses}` groups) — the wire shape tells them apart, so one
/// handler covers both.
pub fn handle_set_peers(
    request: &RtspRequest,
    cseq: u32,
    _context: &Ap2RequestContext<'_>,
) -> Ap2HandleResult {
    let plist = match parse_bplist_body(&request.body) {
        Ok(p) => p,
        Err(e) => return bad_request(cseq, format!("invalid plist: {e}")),
    };

    let PlistValue::Array(entries) = plist else {
        return bad_request(cseq, "SETPEERS body must be an array");
    };

    let mut peers = Vec::new();

    if entries
        .iter()
        .all(|entry| matches!(entry, PlistValue::String(_)))
    {
        // SETPEERS: flat list of address strings.
        for entry in &entries {
            if let PlistValue::String(addr) = entry {
                match addr.parse::<IpAddr>() {
                    Ok(ip) => peers.push(ip),
                    Err(_) => warn!("SETPEERS: unparsable peer address {addr}"),
                }
            }
        }
    } else {
        // SETPEERSX: array of {ID, Addresses} dictionaries.
        for entry in &entries {
            let PlistValue::Dictionary(dict) = entry else {
                continue;
            };
            let Some(PlistValue::Array(addrs)) = dict.get("Addresses") else {
                continue;
            };
            for addr in addrs {
                if let PlistValue::String(addr) = addr {
                    match addr.parse::<IpAddr>() {
                        Ok(ip) => peers.push(ip),
                        Err(_) => warn!("SETPEERSX: unparsable peer address {addr}"),
                    }
                }
            }
        }
    }

    ok(cseq, Ap2Event::TimingPeersUpdated { peers })
}

/// Handle SETRATEANCHORTIME: install a new RTP-to-network-time anchor and
/// toggle spooling per the `rate` field's bit 0.
pub fn handle_set_rate_anchor_time(
    request: &RtspRequest,
    cseq: u32,
    _context: &Ap2RequestContext<'_>,
) -> Ap2HandleResult {
    let plist = match parse_bplist_body(&request.body) {
        Ok(p) => p,
        Err(e) => return bad_request(cseq, format!("invalid plist: {e}")),
    };

    let PlistValue::Dictionary(dict) = plist else {
        return bad_request(cseq, "SETRATEANCHORTIME body must be a dictionary");
    };

    let Some(clock_id) = dict.get("networkTimeTimelineID").and_then(as_i64) else {
        return bad_request(cseq, "missing networkTimeTimelineID");
    };
    let Some(secs) = dict.get("networkTimeSecs").and_then(as_i64) else {
        return bad_request(cseq, "missing networkTimeSecs");
    };
    let Some(frac) = dict.get("networkTimeFrac").and_then(as_i64) else {
        return bad_request(cseq, "missing networkTimeFrac");
    };
    let Some(rtp_time) = dict.get("rtpTime").and_then(as_i64) else {
        return bad_request(cseq, "missing rtpTime");
    };
    let rate = dict.get("rate").and_then(as_i64).unwrap_or(0);

    // networkTimeFrac is a 32-bit NTP-style fixed-point fraction of a second.
    let frac_ns = (u64::try_from(frac.max(0)).unwrap_or(0) * 1_000_000_000) >> 32;
    let network_time_ns = u64::try_from(secs.max(0))
        .unwrap_or(0)
        .saturating_mul(1_000_000_000)
        .saturating_add(frac_ns);

    #[allow(clippy::cast_sign_loss)]
    let rtp_time = rtp_time as u32;
    #[allow(clippy::cast_sign_loss)]
    let clock_id = clock_id as u64;
    #[allow(clippy::cast_sign_loss)]
    let rate = rate as u32;

    ok(
        cseq,
        Ap2Event::AnchorInstalled {
            rtp_time,
            network_time_ns,
            clock_id,
            rate,
        },
    )
}

/// Handle FLUSHBUFFERED: parse the four flush bounds and submit a
/// [`FlushInfo`] to Racked.
pub fn handle_flush_buffered(
    request: &RtspRequest,
    cseq: u32,
    _context: &Ap2RequestContext<'_>,
) -> Ap2HandleResult {
    let plist = match parse_bplist_body(&request.body) {
        Ok(p) => p,
        Err(e) => return bad_request(cseq, format!("invalid plist: {e}")),
    };

    let PlistValue::Dictionary(dict) = plist else {
        return bad_request(cseq, "FLUSHBUFFERED body must be a dictionary");
    };

    let from_seq = dict
        .get("flushFromSeq")
        .and_then(as_i64)
        .and_then(|v| u32::try_from(v).ok());
    let from_ts = dict
        .get("flushFromTS")
        .and_then(as_i64)
        .and_then(|v| u32::try_from(v).ok());
    let Some(until_seq) = dict
        .get("flushUntilSeq")
        .and_then(as_i64)
        .and_then(|v| u32::try_from(v).ok())
    else {
        return bad_request(cseq, "missing flushUntilSeq");
    };
    let Some(until_ts) = dict
        .get("flushUntilTS")
        .and_then(as_i64)
        .and_then(|v| u32::try_from(v).ok())
    else {
        return bad_request(cseq, "missing flushUntilTS");
    };

    let flush_info = FlushInfo {
        from_seq,
        from_ts,
        until_seq,
        until_ts,
        active: true,
        kind: FlushKind::Normal,
    };

    ok(cseq, Ap2Event::FlushBufferedRequested { flush_info })
}
