//! Wire types exchanged with the DMX controller.

use serde::{Deserialize, Serialize};

/// The outbound 16-byte DMX universe state plus a typed envelope, streamed
/// over the data socket as length-prefixed MessagePack.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DmxFrame {
    /// Always `"data"`; kept explicit so the wire format is self-describing
    /// alongside any future message types on the same socket.
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Sequence number of the frame that produced this DMX state.
    pub seq_num: u32,
    /// Timestamp of the frame that produced this DMX state.
    pub timestamp: u32,
    /// Whether the originating frame was silent.
    pub silent: bool,
    /// The 16-byte DMX universe state.
    pub dframe: [u8; 16],
}

impl DmxFrame {
    /// Build a data frame from a render-loop tick's output.
    #[must_use]
    pub fn new(seq_num: u32, timestamp: u32, silent: bool, dframe: [u8; 16]) -> Self {
        Self {
            msg_type: "data".to_string(),
            seq_num,
            timestamp,
            silent,
            dframe,
        }
    }
}

/// The JSON handshake sent once over the control socket after connecting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Handshake {
    #[serde(rename = "type")]
    msg_type: String,
    /// How long the controller may idle before the core considers it gone.
    pub idle_shutdown_ms: u64,
    /// The render loop's configured lead time, in microseconds.
    pub lead_time_us: u64,
    /// A reference timestamp (microseconds) the controller should echo
    /// back in feedback messages for round-trip measurement.
    pub ref_us: u64,
    /// The TCP port the controller should connect to for the data socket.
    pub data_port: u16,
}

impl Handshake {
    /// Build a handshake message.
    #[must_use]
    pub fn new(idle_shutdown_ms: u64, lead_time_us: u64, ref_us: u64, data_port: u16) -> Self {
        Self {
            msg_type: "handshake".to_string(),
            idle_shutdown_ms,
            lead_time_us,
            ref_us,
            data_port,
        }
    }
}

/// Periodic feedback received over the control socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    #[serde(rename = "type")]
    msg_type: String,
    /// Microseconds the controller waited for the last data frame.
    pub data_wait_us: u64,
    /// Microseconds spent applying the last DMX state.
    pub elapsed_us: u64,
    /// Queue-ok counter.
    pub dmx_qok: u64,
    /// Queue-retry-failed counter.
    pub dmx_qrf: u64,
    /// Queue-send-failed counter.
    pub dmx_qsf: u64,
    /// Controller-observed frames per second.
    pub fps: f32,
    /// Echo of the handshake's `ref_us`, for round-trip measurement.
    pub echo_now_us: u64,
    /// Controller's current time, microseconds.
    pub now_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dmx_frame_round_trips_through_messagepack() {
        let frame = DmxFrame::new(7, 3087, false, [1u8; 16]);
        let bytes = rmp_serde::to_vec_named(&frame).unwrap();
        let decoded: DmxFrame = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(frame, decoded);
    }

    #[test]
    fn handshake_serializes_as_json_object_with_type() {
        let hs = Handshake::new(5000, 2000, 123_456, 6454);
        let v = serde_json::to_value(&hs).unwrap();
        assert_eq!(v["type"], "handshake");
        assert_eq!(v["data_port"], 6454);
    }
}
