//! The decoded-audio unit that flows from intake through to render.

use super::peak::ChannelPeaks;
use super::state::FrameState;

/// One decoded RTP packet's worth of audio plus derived features.
///
/// Created on packet receipt (`HeaderParsed`), mutated in place by each
/// pipeline stage, and consumed exactly once — either rendered or discarded
/// by a flush.
#[derive(Debug, Clone)]
pub struct Frame {
    /// 24-bit extended sequence number (AirPlay 2 wraps the wire 16-bit
    /// field into a monotonic 24-bit space per stream).
    pub seq_num: u32,
    /// Source RTP timestamp: samples elapsed since the stream's epoch.
    pub timestamp: u32,
    /// Synchronization source identifier from the RTP header.
    pub ssrc: u32,
    /// Decoded interleaved PCM (left/right), empty once `Played`/`Flushed`.
    pub payload: Vec<f32>,
    /// Per-channel FFT peaks; populated at `DspComplete`.
    pub peaks: [ChannelPeaks; 2],
    /// True iff both channels are below the silence energy threshold.
    pub silent: bool,
    /// Current pipeline stage.
    pub state: FrameState,
}

impl Frame {
    /// Construct a frame fresh off the wire, header parsed, payload still
    /// ciphertext-shaped (caller fills `payload` with raw bytes reinterpreted
    /// once decrypted; here it starts empty).
    #[must_use]
    pub fn new_header_parsed(seq_num: u32, timestamp: u32, ssrc: u32) -> Self {
        Self {
            seq_num,
            timestamp,
            ssrc,
            payload: Vec::new(),
            peaks: [ChannelPeaks::default(), ChannelPeaks::default()],
            silent: false,
            state: FrameState::HeaderParsed,
        }
    }

    /// Build a synthetic Silent frame used to maintain render cadence when
    /// no real audio is available. `timestamp` should be monotonically
    /// advanced by the caller using the nominal samples-per-packet stride.
    #[must_use]
    pub fn new_silent(seq_num: u32, timestamp: u32) -> Self {
        Self {
            seq_num,
            timestamp,
            ssrc: 0,
            payload: Vec::new(),
            peaks: [ChannelPeaks::default(), ChannelPeaks::default()],
            silent: true,
            state: FrameState::Ready,
        }
    }

    /// Whether this frame was synthesized rather than decoded from the wire.
    #[must_use]
    pub fn is_synthetic_silence(&self) -> bool {
        self.silent && self.payload.is_empty() && self.ssrc == 0
    }

    /// Mark the frame consumed by the render loop.
    pub fn mark_played(&mut self) {
        self.payload.clear();
        self.state = FrameState::Played;
    }

    /// Mark the frame discarded by a flush.
    pub fn mark_flushed(&mut self) {
        self.payload.clear();
        self.state = FrameState::Flushed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_frame_has_no_payload() {
        let f = Frame::new_silent(5, 22050);
        assert!(f.silent);
        assert!(f.payload.is_empty());
        assert!(f.is_synthetic_silence());
        assert_eq!(f.state, FrameState::Ready);
    }

    #[test]
    fn mark_played_clears_payload() {
        let mut f = Frame::new_header_parsed(1, 0, 42);
        f.payload = vec![0.1, 0.2];
        f.mark_played();
        assert!(f.payload.is_empty());
        assert_eq!(f.state, FrameState::Played);
    }
}
