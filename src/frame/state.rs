//! Lifecycle states for a decoded audio `Frame`.

/// The state a [`crate::frame::Frame`] occupies as it moves through the
/// decode → buffer → render pipeline.
///
/// Transitions are owned by exactly one pipeline stage at a time: intake
/// produces `HeaderParsed`, the decryptor produces `Deciphered`, the AAC
/// decoder produces `Decoded`, the DSP stage produces `DspComplete`, and the
/// render loop stamps the terminal states (`Ready` is transient; `Played` or
/// `Flushed` is terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// RTP header parsed, ciphertext payload still attached.
    HeaderParsed,
    /// AEAD-decrypted; AAC bitstream recovered.
    Deciphered,
    /// AAC-decoded to interleaved PCM floats.
    Decoded,
    /// Per-channel FFT peak extraction complete.
    DspComplete,
    /// Fully processed and sitting in Racked awaiting playback.
    Ready,
    /// Target play-time already elapsed; skipped by the render loop.
    Outdated,
    /// Target play-time is further out than the lead window.
    Future,
    /// Consumed by the render loop and handed to an FX.
    Played,
    /// Discarded by a `FlushInfo` match.
    Flushed,
    /// RTP header malformed (bad version, truncated).
    ParseFailure,
    /// Decipher succeeded but AAC parse/decode failed.
    DecodeFailure,
}

impl FrameState {
    /// Whether a frame in this state still holds a payload worth inspecting.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Played | Self::Flushed | Self::ParseFailure | Self::DecodeFailure
        )
    }

    /// Whether this frame can still be consumed by the render loop.
    #[must_use]
    pub fn is_consumable(self) -> bool {
        matches!(self, Self::Ready | Self::Outdated | Self::Future)
    }
}
