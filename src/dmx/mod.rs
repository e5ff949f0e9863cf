//! The DMX Controller Link: resolves a controller by zeroconf name and runs
//! a dual-socket handshake/feedback/data pattern synchronized to the render
//! loop.

mod link;
mod message;

pub use link::{DmxLink, DmxLinkConfig, DmxLinkError, ResolvedController, browse};
pub use message::{DmxFrame, Feedback, Handshake};
