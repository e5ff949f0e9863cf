//! RTP packet framing for AirPlay 2 buffered-audio streams.

#![allow(clippy::all)]
#![allow(clippy::pedantic)]
#![allow(clippy::nursery)]
#![allow(missing_docs)]

mod codec;
mod control;
mod packet;
pub mod packet_buffer;

#[cfg(test)]
mod codec_tests;
#[cfg(test)]
mod packet_buffer_tests;
#[cfg(test)]
mod packet_tests;

pub use codec::{AudioPacketBuilder, RtpCodec, RtpCodecError, RtpEncryptionMode};
pub use control::{ControlPacket, RetransmitRequest};
pub use packet::{PayloadType, RtpDecodeError, RtpHeader, RtpPacket};

/// RTP protocol constants for the buffered-audio stream type.
pub mod constants {
    /// Audio frames (samples) per RTP packet in AirPlay 2's buffered stream.
    pub const FRAMES_PER_PACKET: usize = 1024;

    /// Audio sample rate
    pub const SAMPLE_RATE: u32 = 44100;

    /// Audio channels (stereo)
    pub const CHANNELS: u8 = 2;

    /// Bits per sample
    pub const BITS_PER_SAMPLE: u8 = 16;

    /// Nominal frame cadence, `SAMPLE_RATE / FRAMES_PER_PACKET` frames/sec.
    pub const FRAME_PERIOD_MS: f64 = (FRAMES_PER_PACKET as f64 / SAMPLE_RATE as f64) * 1000.0;
}
