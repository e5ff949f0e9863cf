//! Stream types for `AirPlay` 2 SETUP negotiation

use std::net::SocketAddr;

/// Stream types in SETUP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamType {
    /// General audio stream (type 96)
    Audio,
    /// Control/timing stream (type 103)
    Control,
    /// Event channel (type 130)
    Event,
    /// Timing (PTP) stream (type 150)
    Timing,
    /// Buffered audio (type 96 with buffered flag)
    BufferedAudio,
    /// Unknown stream type
    Unknown(u32),
}

impl From<u32> for StreamType {
    fn from(value: u32) -> Self {
        match value {
            96 => Self::Audio,
            103 => Self::Control,
            130 => Self::Event,
            150 => Self::Timing,
            _ => Self::Unknown(value),
        }
    }
}

impl From<StreamType> for i64 {
    fn from(val: StreamType) -> Self {
        match val {
            StreamType::Audio | StreamType::BufferedAudio => 96,
            StreamType::Control => 103,
            StreamType::Event => 130,
            StreamType::Timing => 150,
            StreamType::Unknown(t) => i64::from(t),
        }
    }
}

/// Timing protocol selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimingProtocol {
    /// Network Time Protocol (legacy)
    #[default]
    Ntp,
    /// Precision Time Protocol (`AirPlay` 2)
    Ptp,
    /// No timing (not recommended)
    None,
}

impl From<&str> for TimingProtocol {
    fn from(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "PTP" => Self::Ptp,
            "NONE" => Self::None,
            _ => Self::Ntp,
        }
    }
}

/// Encryption type for audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncryptionType {
    /// No encryption
    #[default]
    None,
    /// `AirPlay` 1 style (AES-128-CTR)
    Aes128Ctr,
    /// `AirPlay` 2 style (ChaCha20-Poly1305)
    ChaCha20Poly1305,
}

/// Timing peer information for PTP
#[derive(Debug, Clone)]
pub struct TimingPeerInfo {
    /// Peer ID
    pub peer_id: u64,
    /// Peer addresses
    pub addresses: Vec<SocketAddr>,
}

/// Audio stream format parameters
#[derive(Debug, Clone)]
pub struct AudioStreamFormat {
    /// Codec type (96=ALAC, 97=AAC, etc.)
    pub codec: u32,
    /// Sample rate (Hz)
    pub sample_rate: u32,
    /// Channels
    pub channels: u8,
    /// Bits per sample
    pub bits_per_sample: u8,
    /// Frames per packet
    pub frames_per_packet: u32,
    /// Compression type (for ALAC)
    pub compression_type: Option<u32>,
    /// Spf (samples per frame)
    pub spf: Option<u32>,
}

/// The negotiated timing category for a stream, from SETUP's
/// `timingProtocol`/`timingPeerInfo` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimingCategory {
    /// No timing category negotiated yet.
    #[default]
    Unspecified,
    /// PTP timing peer — the only category this receiver accepts.
    Ptp,
    /// Legacy NTP timing — rejected unconditionally.
    Ntp,
    /// Timing driven by the controlling remote rather than a peer group.
    RemoteControl,
}

/// `streamType` as negotiated in the `streams` array of the second SETUP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// No stream negotiated.
    None,
    /// Realtime audio (type 96) — rejected; this receiver only buffers.
    Realtime,
    /// Buffered audio (type 103) — the only kind this receiver accepts.
    Buffered,
}

impl StreamKind {
    /// Numeric `streamType` wire value.
    #[must_use]
    pub fn wire_value(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Realtime => 96,
            Self::Buffered => 103,
        }
    }
}

/// Error negotiating a stream descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StreamDescriptorError {
    /// The source requested NTP or left timing unspecified; this receiver
    /// only accepts PTP-timed (or remote-control-timed) streams.
    #[error("rejected timing category {0:?}")]
    RejectedTimingCategory(TimingCategory),
    /// The source requested a realtime (type 96) stream; this receiver only
    /// buffers (type 103).
    #[error("realtime streams are not supported")]
    RealtimeNotSupported,
}

/// The negotiated shape of one audio session's stream, per spec §3.
#[derive(Debug, Clone)]
pub struct StreamDescriptor {
    /// Negotiated timing category.
    pub timing_category: TimingCategory,
    /// Negotiated timing protocol (kept for compatibility with the initial
    /// SETUP's `timingProtocol` string).
    pub timing_protocol: TimingProtocol,
    /// Negotiated stream kind (`realtime` is always rejected).
    pub stream_kind: StreamKind,
    /// Negotiated audio format.
    pub audio_format: Option<AudioStreamFormat>,
    /// `compressionType`, when present (ALAC magic cookie format etc).
    pub compression_type: Option<u32>,
    /// Samples per packet (AirPlay 2's buffered audio is 1024 by default).
    pub samples_per_packet: u32,
    /// `connectionID` from SETUP.
    pub connection_id: Option<u64>,
    /// `clientID` from SETUP.
    pub client_id: Option<String>,
    /// Whether the source indicated it supports a dynamic stream ID.
    pub supports_dynamic_stream_id: bool,
}

impl StreamDescriptor {
    /// Build a descriptor, enforcing the invariant that NTP/unspecified
    /// timing and realtime streams are rejected outright.
    ///
    /// # Errors
    /// [`StreamDescriptorError`] if the negotiated timing category or
    /// stream kind is one this receiver refuses to serve.
    pub fn new(
        timing_category: TimingCategory,
        timing_protocol: TimingProtocol,
        stream_kind: StreamKind,
        samples_per_packet: u32,
    ) -> Result<Self, StreamDescriptorError> {
        if matches!(
            timing_category,
            TimingCategory::Ntp | TimingCategory::Unspecified
        ) {
            return Err(StreamDescriptorError::RejectedTimingCategory(
                timing_category,
            ));
        }
        if stream_kind == StreamKind::Realtime {
            return Err(StreamDescriptorError::RealtimeNotSupported);
        }
        Ok(Self {
            timing_category,
            timing_protocol,
            stream_kind,
            audio_format: None,
            compression_type: None,
            samples_per_packet,
            connection_id: None,
            client_id: None,
            supports_dynamic_stream_id: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_ntp_timing() {
        let err = StreamDescriptor::new(
            TimingCategory::Ntp,
            TimingProtocol::Ntp,
            StreamKind::Buffered,
            1024,
        )
        .unwrap_err();
        assert_eq!(
            err,
            StreamDescriptorError::RejectedTimingCategory(TimingCategory::Ntp)
        );
    }

    #[test]
    fn rejects_unspecified_timing() {
        assert!(
            StreamDescriptor::new(
                TimingCategory::Unspecified,
                TimingProtocol::Ntp,
                StreamKind::Buffered,
                1024,
            )
            .is_err()
        );
    }

    #[test]
    fn rejects_realtime_stream_kind() {
        let err = StreamDescriptor::new(
            TimingCategory::Ptp,
            TimingProtocol::Ptp,
            StreamKind::Realtime,
            1024,
        )
        .unwrap_err();
        assert_eq!(err, StreamDescriptorError::RealtimeNotSupported);
    }

    #[test]
    fn accepts_ptp_buffered_stream() {
        let descriptor = StreamDescriptor::new(
            TimingCategory::Ptp,
            TimingProtocol::Ptp,
            StreamKind::Buffered,
            1024,
        )
        .unwrap();
        assert_eq!(descriptor.stream_kind, StreamKind::Buffered);
    }
}
