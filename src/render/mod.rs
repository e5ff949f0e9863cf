//! The render loop: paces frame consumption by the master clock, selects
//! the active lighting effect, and produces DMX frames for the controller
//! link.

mod classify;
mod fx;
#[allow(clippy::module_inception)]
mod loop_;

pub use classify::{OUTDATED_TOLERANCE, PlayTimeClass, classify};
pub use fx::{DmxState, FxEffect, FxKind, MajorPeak, Standby};
pub use loop_::{RenderConfig, RenderLoop, TickOutcome};
