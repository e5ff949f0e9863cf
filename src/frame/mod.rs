//! The decode → buffer → playback data path: [`Frame`], [`Reel`], [`Racked`]
//! and flush semantics.
//!
//! This module holds the audio data exclusively owned by the pipeline stage
//! currently processing it; Racked is the only piece shared between the
//! packet-intake producer and the render-loop consumer, and it guards that
//! sharing internally.

mod flush_info;
mod frame;
mod peak;
mod racked;
mod reel;

pub mod decoder;

pub use flush_info::{FlushInfo, FlushKind};
pub use frame::Frame;
pub use peak::{ChannelPeaks, Peak, channels_are_silent, find_peaks};
pub use racked::{HIGH_WATER_MARK, Racked, RackedConfig, WIP_GRACE_PERIOD};
pub use reel::{REEL_CAPACITY, Reel};
pub use state::FrameState;

mod state;
