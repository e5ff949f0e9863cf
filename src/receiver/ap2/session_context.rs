//! Per-connection state spec's data model names `SessionContext`: the
//! remote-control identity and group-membership fields `Ap2SessionState`
//! (the RTSP-method gating state machine) doesn't carry, plus the
//! idle-timeout deadline that destroys a connection that never sends
//! TEARDOWN and never closes the transport.

use std::time::{Duration, Instant};

use crate::protocol::rtsp::RtspRequest;
use crate::protocol::rtsp::headers::names;

/// Remote-control identity, group membership, and the idle-timeout clock
/// for one accepted RTSP connection.
///
/// `dacp_id`/`active_remote` are retained and echoed where senders expect
/// them but nothing here dials the `DACP` client they'd normally address;
/// no media-player remote-control surface is implemented.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Last `CSeq` seen on this connection.
    pub cseq: u32,
    /// `Active-Remote` header value, if the source ever sent one.
    pub active_remote: Option<String>,
    /// `DACP-ID` header value, if the source ever sent one.
    pub dacp_id: Option<String>,
    /// `User-Agent` header value, if the source ever sent one.
    pub user_agent: Option<String>,
    /// `X-Apple-Client-Name` header value, if the source ever sent one.
    pub client_name: Option<String>,
    /// Group identifier, for multi-room sessions. Unset for a solo session.
    pub group_id: Option<String>,
    /// Whether this session's group contains the group leader.
    pub group_contains_leader: bool,
    idle_timeout: Duration,
    last_activity: Instant,
}

impl SessionContext {
    /// Start a fresh context with `idle_timeout` as the no-traffic budget.
    #[must_use]
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            cseq: 0,
            active_remote: None,
            dacp_id: None,
            user_agent: None,
            client_name: None,
            group_id: None,
            group_contains_leader: false,
            idle_timeout,
            last_activity: Instant::now(),
        }
    }

    /// Absorb the identity headers off one request and reset the idle
    /// clock. Headers the source never sends are left at their prior value.
    pub fn observe(&mut self, request: &RtspRequest) {
        if let Some(cseq) = request.headers.cseq() {
            self.cseq = cseq;
        }
        if let Some(v) = request.headers.get(names::ACTIVE_REMOTE) {
            self.active_remote = Some(v.to_string());
        }
        if let Some(v) = request.headers.get(names::DACP_ID) {
            self.dacp_id = Some(v.to_string());
        }
        if let Some(v) = request.headers.get(names::USER_AGENT) {
            self.user_agent = Some(v.to_string());
        }
        if let Some(v) = request.headers.get("X-Apple-Client-Name") {
            self.client_name = Some(v.to_string());
        }
        self.touch();
    }

    /// Reset the idle-timeout clock without touching identity fields
    /// (called on any traffic, not just a full request).
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Whether `idle_timeout` has elapsed since the last recorded activity.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.last_activity.elapsed() >= self.idle_timeout
    }

    /// Remaining budget before `is_idle` would report true, for sizing the
    /// `tokio::time::timeout` around the connection's next socket read.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.idle_timeout
            .saturating_sub(self.last_activity.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::rtsp::{Headers, Method, RtspRequest};

    fn request_with_headers(pairs: &[(&str, &str)]) -> RtspRequest {
        let mut headers = Headers::new();
        for (k, v) in pairs {
            headers.insert(*k, *v);
        }
        RtspRequest {
            method: Method::Options,
            uri: "*".to_string(),
            headers,
            body: Vec::new(),
        }
    }

    #[test]
    fn observe_captures_remote_control_identity() {
        let mut ctx = SessionContext::new(Duration::from_secs(10));
        let request = request_with_headers(&[
            ("CSeq", "3"),
            ("DACP-ID", "1234ABCD"),
            ("Active-Remote", "987654321"),
            ("User-Agent", "AirPlay/410.42"),
        ]);
        ctx.observe(&request);
        assert_eq!(ctx.cseq, 3);
        assert_eq!(ctx.dacp_id.as_deref(), Some("1234ABCD"));
        assert_eq!(ctx.active_remote.as_deref(), Some("987654321"));
        assert_eq!(ctx.user_agent.as_deref(), Some("AirPlay/410.42"));
    }

    #[test]
    fn missing_headers_leave_prior_identity_untouched() {
        let mut ctx = SessionContext::new(Duration::from_secs(10));
        ctx.observe(&request_with_headers(&[("DACP-ID", "ABC")]));
        ctx.observe(&request_with_headers(&[("CSeq", "1")]));
        assert_eq!(ctx.dacp_id.as_deref(), Some("ABC"));
    }

    #[test]
    fn is_idle_reports_false_before_timeout_elapses() {
        let ctx = SessionContext::new(Duration::from_secs(60));
        assert!(!ctx.is_idle());
        assert!(ctx.remaining() <= Duration::from_secs(60));
    }

    #[test]
    fn touch_resets_the_idle_clock() {
        let mut ctx = SessionContext::new(Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(5));
        assert!(ctx.is_idle());
        ctx.touch();
        assert!(!ctx.is_idle());
    }
}
