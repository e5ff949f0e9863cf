//! The single-threaded, frame-paced scheduler: obtains the next frame,
//! classifies it against the local clock, drives the active FX, and
//! dispatches DMX frames to the controller link.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::debug;

use crate::dmx::{DmxFrame, DmxLink};
use crate::frame::Racked;
use crate::sync::{AnchorStore, ClockBridge, local_time_for};

use super::classify::{PlayTimeClass, classify};
use super::fx::{FxEffect, FxKind, MajorPeak, Standby};

/// Render-loop timing configuration.
#[derive(Debug, Clone, Copy)]
pub struct RenderConfig {
    /// Window within which a frame's target play-time counts as `Ready`.
    pub lead_time: Duration,
    /// Hard cap on how long `next_frame` may be awaited before a Silent
    /// frame is substituted (Racked itself never blocks this long; this is
    /// the budget the loop allows the whole obtain-and-classify step).
    pub lead_time_min: Duration,
    /// Nominal frame cadence: `sample_rate / samples_per_packet`. AirPlay's
    /// 1024-sample packets at 44.1 kHz give ≈44 frames/sec (≈22.7 ms).
    pub frame_period: Duration,
    /// Consecutive silent ticks before Standby reaches `ALL_STOP`.
    pub standby_ticks_to_stop: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            lead_time: Duration::from_millis(100),
            lead_time_min: Duration::from_millis(250),
            frame_period: Duration::from_micros(22_676),
            standby_ticks_to_stop: 200, // ~4.5s of silence at 44 fps
        }
    }
}

/// Monotonic "now" in nanoseconds, matching the scale `AnchorStore` converts
/// RTP timestamps into.
fn now_ns() -> i128 {
    // A process-local monotonic epoch: time since an arbitrary fixed point
    // in this process's lifetime, which is all the render loop ever compares
    // against (never serialized, never compared across processes).
    use std::sync::OnceLock;
    use std::time::Instant;
    static START: OnceLock<Instant> = OnceLock::new();
    let start = *START.get_or_init(Instant::now);
    start.elapsed().as_nanos() as i128
}

/// Outcome of one render-loop tick.
#[derive(Debug)]
pub enum TickOutcome {
    /// A DMX frame was produced and should be sent to the controller link.
    Rendered(DmxFrame),
    /// The frame was outdated and dropped without rendering.
    Skipped,
    /// The active effect reached `ALL_STOP`; the loop should enter Standby
    /// (drop its guard, cancel timers) until activity resumes.
    EnteredStandby,
}

/// Owns the frame cadence: pulls from [`Racked`], maps to local time via
/// [`AnchorStore`]/[`ClockBridge`], drives the active [`FxEffect`], and
/// reports what to do with the tick's result. Sending the resulting
/// [`DmxFrame`] over a [`DmxLink`] is left to the caller so the loop itself
/// stays unit-testable without a live socket.
pub struct RenderLoop {
    racked: Arc<Racked>,
    anchor: Arc<AnchorStore>,
    clock_bridge: Arc<Mutex<ClockBridge>>,
    fx: Box<dyn FxEffect>,
    config: RenderConfig,
    in_standby: bool,
}

impl RenderLoop {
    /// Build a render loop starting in the `Standby` effect (matching the
    /// "no first frame yet" startup condition).
    #[must_use]
    pub fn new(
        racked: Arc<Racked>,
        anchor: Arc<AnchorStore>,
        clock_bridge: Arc<Mutex<ClockBridge>>,
        config: RenderConfig,
    ) -> Self {
        Self {
            racked,
            anchor,
            clock_bridge,
            fx: Box::new(Standby::new(config.standby_ticks_to_stop)),
            config,
            in_standby: false,
        }
    }

    /// Run one scheduling tick: obtain the next frame, classify it, and
    /// drive the active effect.
    pub async fn tick(&mut self) -> TickOutcome {
        let mut frame = self.racked.next_frame().await;

        let target_ns = if frame.is_synthetic_silence() {
            now_ns()
        } else {
            let bridge = self.clock_bridge.lock().await;
            match local_time_for(&self.anchor, &bridge, frame.timestamp).await {
                Ok(t) => t,
                Err(_) => now_ns(),
            }
        };

        let mut now = now_ns();
        let class = classify(target_ns, now, self.config.lead_time);
        if class == PlayTimeClass::Future {
            let wait_ns = (target_ns - now - self.config.lead_time.as_nanos() as i128).max(0);
            if wait_ns > 0 {
                tokio::time::sleep(Duration::from_nanos(wait_ns as u64)).await;
            }
            now = now_ns();
        }

        let class = classify(target_ns, now, self.config.lead_time);
        if class == PlayTimeClass::Outdated {
            frame.mark_played();
            return TickOutcome::Skipped;
        }

        let peaks = if frame.silent {
            None
        } else {
            Some(&frame.peaks)
        };
        let (dmx_state, finished) = self.fx.tick(peaks);

        if finished {
            self.switch_fx(self.fx.suggested_fx_next());
        }

        if self.fx.all_stopped() {
            self.in_standby = true;
        } else if self.in_standby && !frame.silent {
            self.in_standby = false;
        }

        let dmx_frame = DmxFrame::new(frame.seq_num, frame.timestamp, frame.silent, dmx_state);
        frame.mark_played();

        if self.in_standby {
            debug!("render loop idling in standby");
            TickOutcome::EnteredStandby
        } else {
            TickOutcome::Rendered(dmx_frame)
        }
    }

    fn switch_fx(&mut self, next: FxKind) {
        self.fx = match next {
            FxKind::Standby => Box::new(Standby::new(self.config.standby_ticks_to_stop)),
            FxKind::MajorPeak => Box::new(MajorPeak::new()),
        };
    }

    /// Run forever, pacing ticks at `frame_period` and forwarding rendered
    /// frames to `link`. Returns only on an unrecoverable link error; the
    /// caller is expected to race this against a shutdown signal.
    pub async fn run(&mut self, link: &mut DmxLink) {
        let mut interval = tokio::time::interval(self.config.frame_period);
        loop {
            interval.tick().await;
            match self.tick().await {
                TickOutcome::Rendered(frame) => link.send_frame(&frame).await,
                TickOutcome::Skipped | TickOutcome::EnteredStandby => {}
            }
        }
    }
}
