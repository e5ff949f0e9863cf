//! /command Endpoint Handler

use super::body_handler::{parse_bplist_body, PlistExt};
use super::request_handler::{Ap2HandleResult, Ap2RequestContext};
use super::response_builder::Ap2ResponseBuilder;
use crate::protocol::rtsp::{RtspRequest, StatusCode};

/// The only `/command` body this core understands, per spec.md §4.3: a
/// remote reporting the commands it supports. Accepted silently; anything
/// else is rejected rather than interpreted as a media-player instruction
/// (spec.md §1 Non-goals: not a general-purpose media player).
const UPDATE_MR_SUPPORTED_COMMANDS: &str = "updateMRSupportedCommands";

/// Handle POST /command
pub fn handle_command(
    request: &RtspRequest,
    cseq: u32,
    _context: &Ap2RequestContext,
) -> Ap2HandleResult {
    let plist = match parse_bplist_body(&request.body) {
        Ok(p) => p,
        Err(e) => {
            return Ap2HandleResult {
                response: Ap2ResponseBuilder::error(StatusCode::BAD_REQUEST)
                    .cseq(cseq)
                    .encode(),
                new_state: None,
                event: None,
                error: Some(format!("Failed to parse command: {e}")),
            };
        }
    };

    if plist.get_string("type") == Some(UPDATE_MR_SUPPORTED_COMMANDS) {
        return Ap2HandleResult {
            response: Ap2ResponseBuilder::ok().cseq(cseq).encode(),
            new_state: None,
            event: None,
            error: None,
        };
    }

    Ap2HandleResult {
        response: Ap2ResponseBuilder::error(StatusCode::BAD_REQUEST)
            .cseq(cseq)
            .encode(),
        new_state: None,
        event: None,
        error: Some("unsupported /command type".to_string()),
    }
}

/// Handle POST /feedback
pub fn handle_feedback(
    request: &RtspRequest,
    cseq: u32,
    _context: &Ap2RequestContext,
) -> Ap2HandleResult {
    // Feedback is typically empty or contains timing info
    let _plist = parse_bplist_body(&request.body);

    // Just acknowledge
    Ap2HandleResult {
        response: Ap2ResponseBuilder::ok().cseq(cseq).encode(),
        new_state: None,
        event: None,
        error: None,
    }
}
