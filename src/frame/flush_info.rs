//! Flush bounds extracted from a FLUSHBUFFERED (or legacy FLUSH) request.

use super::frame::Frame;

/// The kind of flush requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushKind {
    /// Discard every frame regardless of bounds.
    All,
    /// Bounded flush driven by `from`/`until` seq and timestamp.
    Normal,
    /// Flush issued while the receiver is inactive (no streams torn down).
    Inactive,
    /// Flush issued as part of a full session teardown.
    Complete,
}

/// A request to discard buffered frames within (or beyond) a range.
#[derive(Debug, Clone, Copy)]
pub struct FlushInfo {
    /// Lower sequence bound (inclusive), if known.
    pub from_seq: Option<u32>,
    /// Lower timestamp bound (inclusive), if known.
    pub from_ts: Option<u32>,
    /// Upper sequence bound (inclusive).
    pub until_seq: u32,
    /// Upper timestamp bound (inclusive).
    pub until_ts: u32,
    /// Whether this flush is still being applied to incoming frames.
    pub active: bool,
    /// The flush's origin/kind.
    pub kind: FlushKind,
}

impl FlushInfo {
    /// Build an unconditional flush-everything request.
    #[must_use]
    pub fn all(kind: FlushKind) -> Self {
        Self {
            from_seq: None,
            from_ts: None,
            until_seq: u32::MAX,
            until_ts: u32::MAX,
            active: true,
            kind: FlushKind::All.max_with(kind),
        }
    }

    /// Build a bounded flush from the four FLUSHBUFFERED plist fields.
    #[must_use]
    pub fn bounded(from_seq: u32, from_ts: u32, until_seq: u32, until_ts: u32) -> Self {
        Self {
            from_seq: Some(from_seq),
            from_ts: Some(from_ts),
            until_seq,
            until_ts,
            active: true,
            kind: FlushKind::Normal,
        }
    }

    /// Whether `frame` is discarded by this flush.
    ///
    /// A frame is discarded iff `kind == All`, or `seq_num <= until_seq AND
    /// timestamp <= until_ts`. `from_seq`/`from_ts` are retained for callers
    /// that want to report the requested range but never gate the discard
    /// decision.
    #[must_use]
    pub fn matches(&self, frame: &Frame) -> bool {
        if self.kind == FlushKind::All {
            return true;
        }
        frame.seq_num <= self.until_seq && frame.timestamp <= self.until_ts
    }
}

impl FlushKind {
    fn max_with(self, other: FlushKind) -> FlushKind {
        if self == FlushKind::All || other == FlushKind::All {
            FlushKind::All
        } else {
            other
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::frame::Frame;

    fn frame(seq: u32, ts: u32) -> Frame {
        Frame::new_header_parsed(seq, ts, 1)
    }

    #[test]
    fn all_matches_everything() {
        let f = FlushInfo::all(FlushKind::Complete);
        assert!(f.matches(&frame(0, 0)));
        assert!(f.matches(&frame(u32::MAX, u32::MAX)));
    }

    #[test]
    fn bounded_respects_until() {
        let f = FlushInfo::bounded(100, 44100, 200, 88200);
        assert!(f.matches(&frame(200, 88200)));
        assert!(!f.matches(&frame(201, 88200)));
        assert!(!f.matches(&frame(200, 88201)));
    }

    #[test]
    fn bounded_discards_below_from_too() {
        // spec.md §3/§8: discard is gated only on the until bound; from_*
        // is informational and never excludes a frame below it.
        let f = FlushInfo::bounded(100, 44100, 200, 88200);
        assert!(f.matches(&frame(50, 22050)));
        assert!(f.matches(&frame(150, 66150)));
    }
}
