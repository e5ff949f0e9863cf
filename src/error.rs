//! The aggregating error type returned by the composition root.
//!
//! Individual subsystems (the clock bridge, the frame decoder, the DMX link,
//! …) define their own narrow error enums, consumed directly by their
//! callers per §7's propagation policy: failures translatable to an RTSP
//! status code are translated at the handler boundary and never reach this
//! type. `AirPlayError` only aggregates the handful of failures the
//! composition root itself has to react to (fatal conditions, and anything
//! surfaced through [`AirPlay2Receiver`](crate::receiver::ap2::AirPlay2Receiver)'s
//! public API).

use crate::config::ConfigError;
use crate::discovery::AdvertiserError;
use crate::dmx::DmxLinkError;
use crate::sync::ClockBridgeError;

/// Top-level error type for the receiver process.
#[derive(Debug, thiserror::Error)]
pub enum AirPlayError {
    /// Configuration file or CLI overlay failed to load.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The PTP helper's shared-memory record had an unexpected version.
    /// Fatal for the process per §7.
    #[error("clock bridge error: {0}")]
    ClockBridge(#[from] ClockBridgeError),

    /// mDNS advertisement setup failed.
    #[error("service advertiser error: {0}")]
    Advertiser(#[from] AdvertiserError),

    /// The DMX controller link could not be established.
    #[error("DMX link error: {0}")]
    Dmx(#[from] DmxLinkError),

    /// The RTSP listener socket could not be bound.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The receiver was asked to start while already running, or to operate
    /// in a state that doesn't allow the requested transition.
    #[error("invalid receiver state: {0}")]
    InvalidState(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use");
        let err: AirPlayError = io_err.into();
        assert!(matches!(err, AirPlayError::Io(_)));
    }

    #[test]
    fn is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AirPlayError>();
    }
}
