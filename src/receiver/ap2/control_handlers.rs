//! RECORD, GET_PARAMETER, SET_PARAMETER, and TEARDOWN handling.
//!
//! These four round out the RTSP method set the request router dispatches
//! to `Ap2Handlers`. None of them touch the pairing/setup state machines, so
//! they're grouped separately from [`super::setup_handler`].

use super::request_handler::{Ap2Event, Ap2HandleResult, Ap2RequestContext};
use super::response_builder::Ap2ResponseBuilder;
use crate::protocol::rtsp::{RtspRequest, StatusCode};

fn ok(cseq: u32, event: Option<Ap2Event>) -> Ap2HandleResult {
    Ap2HandleResult {
        response: Ap2ResponseBuilder::ok().cseq(cseq).encode(),
        new_state: None,
        event,
        error: None,
    }
}

/// Handle RECORD: 200, no-op. Streaming begins as soon as the source starts
/// sending RTP packets; RECORD itself carries no parameters this receiver
/// needs.
pub fn handle_record(_request: &RtspRequest, cseq: u32, _context: &Ap2RequestContext) -> Ap2HandleResult {
    ok(cseq, None)
}

/// Handle GET_PARAMETER. The only parameter senders query is `volume`; this
/// receiver has no independent volume control, so it always reports 0.0 dB.
pub fn handle_get_parameter(
    _request: &RtspRequest,
    cseq: u32,
    _context: &Ap2RequestContext,
) -> Ap2HandleResult {
    Ap2HandleResult {
        response: Ap2ResponseBuilder::ok()
            .cseq(cseq)
            .text_body("\r\nvolume: 0.0\r\n")
            .encode(),
        new_state: None,
        event: None,
        error: None,
    }
}

/// Handle SET_PARAMETER: 200, ignored. Senders use this for volume and
/// progress updates that this receiver has no use for.
pub fn handle_set_parameter(
    _request: &RtspRequest,
    cseq: u32,
    _context: &Ap2RequestContext,
) -> Ap2HandleResult {
    ok(cseq, None)
}

/// Handle FLUSH (legacy, unbounded): 200, emits [`Ap2Event::FlushRequested`]
/// with the `seq`/`rtptime` pair carried on the `RTP-Info` header, if present.
/// Senders that support `FLUSHBUFFERED` use that instead.
pub fn handle_flush(request: &RtspRequest, cseq: u32, _context: &Ap2RequestContext) -> Ap2HandleResult {
    let rtp_info = request.headers.get("RTP-Info");
    let until_sequence = rtp_info
        .and_then(|v| v.split(';').find_map(|p| p.trim().strip_prefix("seq=")))
        .and_then(|s| s.parse::<u16>().ok());
    let until_timestamp = rtp_info
        .and_then(|v| v.split(';').find_map(|p| p.trim().strip_prefix("rtptime=")))
        .and_then(|s| s.parse::<u32>().ok());

    ok(
        cseq,
        Some(Ap2Event::FlushRequested {
            until_sequence,
            until_timestamp,
        }),
    )
}

/// Handle TEARDOWN. Always 200. Emits [`Ap2Event::Teardown`] so the
/// connection loop clears the shared key, disables spooling into Racked,
/// and (when the body omits a `streams` array) flushes everything and
/// schedules the connection close.
pub fn handle_teardown(_request: &RtspRequest, cseq: u32, _context: &Ap2RequestContext) -> Ap2HandleResult {
    ok(cseq, Some(Ap2Event::Teardown))
}

/// Handle `POST /auth-setup`. Legacy MFi authentication predates `HomeKit`
/// transient pairing and is not implemented; senders that support pair-setup
/// never send this.
pub fn handle_auth_setup(
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
        error: Some("auth-setup (MFi) not supported".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receiver::ap2::request_handler::Ap2RequestContext;
    use crate::receiver::ap2::session_state::Ap2SessionState;
    use crate::protocol::rtsp::Method;

    fn ctx(state: &Ap2SessionState) -> Ap2RequestContext<'_> {
        Ap2RequestContext {
            state,
            session_id: None,
            encrypted: true,
            decrypt: None,
        }
    }

    #[test]
    fn record_is_always_ok() {
        let request = RtspRequest::builder(Method::Record, "rtsp://x/").build();
        let state = Ap2SessionState::Streaming;
        let result = handle_record(&request, 9, &ctx(&state));
        assert!(result.response.starts_with(b"RTSP/1.0 200"));
    }

    #[test]
    fn get_parameter_reports_zero_volume() {
        let request = RtspRequest::builder(Method::GetParameter, "rtsp://x/").build();
        let state = Ap2SessionState::Streaming;
        let result = handle_get_parameter(&request, 1, &ctx(&state));
        let body = String::from_utf8(result.response).unwrap();
        assert!(body.contains("volume: 0.0"));
    }

    #[test]
    fn flush_parses_rtp_info() {
        let mut request = RtspRequest::builder(Method::Flush, "rtsp://x/").build();
        request
            .headers
            .insert("RTP-Info", "seq=100;rtptime=44100");
        let state = Ap2SessionState::Streaming;
        let result = handle_flush(&request, 3, &ctx(&state));
        assert!(matches!(
            result.event,
            Some(Ap2Event::FlushRequested {
                until_sequence: Some(100),
                until_timestamp: Some(44100),
            })
        ));
    }

    #[test]
    fn teardown_emits_event() {
        let request = RtspRequest::builder(Method::Teardown, "rtsp://x/").build();
        let state = Ap2SessionState::Streaming;
        let result = handle_teardown(&request, 2, &ctx(&state));
        assert!(matches!(result.event, Some(Ap2Event::Teardown)));
    }
}
