//! The clock & anchor subsystem: a shared-memory bridge to an external PTP
//! helper, and per-session anchor points mapping source RTP timestamps to
//! local monotonic time.

mod anchor_store;
mod clock_bridge;
mod clock_info;

pub use anchor_store::{AnchorData, AnchorError, AnchorStore, AnchorTimeError, local_time_for};
pub use clock_bridge::{ClockBridge, ClockBridgeError, HELPER_CONTROL_PORT};
pub use clock_info::{ClockInfo, EXPECTED_VERSION};
