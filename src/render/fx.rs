//! Pluggable lighting-effect interface and the two built-in effects the
//! render loop switches between.

use crate::frame::ChannelPeaks;

/// The 16-byte DMX universe state an effect produces for one tick.
pub type DmxState = [u8; 16];

/// Which built-in effect the render loop should switch to next, as
/// suggested by the effect that just finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FxKind {
    /// No audio input; fades to black / idles.
    Standby,
    /// Audio input; maps per-channel spectral peaks to color/brightness.
    MajorPeak,
}

/// A pluggable lighting effect.
///
/// The render loop feeds one frame's peak summary per tick and receives a
/// DMX state plus a `finished` flag; when `finished` is true the loop may
/// switch effects based on `suggested_fx_next`.
pub trait FxEffect: Send {
    /// Which built-in effect this is, for the render loop's switch logic.
    fn kind(&self) -> FxKind;

    /// Process one tick's peak summary (or `None` for a silent frame),
    /// returning the DMX state to send and whether this effect has reached
    /// a natural stopping point.
    fn tick(&mut self, peaks: Option<&[ChannelPeaks; 2]>) -> (DmxState, bool);

    /// The effect this one suggests switching to once `tick` reports
    /// `finished`.
    fn suggested_fx_next(&self) -> FxKind;

    /// Reset any internal fade/timer state (used when re-entering an
    /// effect after a switch).
    fn reset(&mut self);

    /// Whether this effect has reached a full stop (only meaningful for
    /// [`Standby`], which uses it to tell the render loop to drop its guard
    /// and cancel timers until activity resumes).
    fn all_stopped(&self) -> bool {
        false
    }
}

/// Idles the DMX universe at black. Reaches its `ALL_STOP` point after
/// `silence_ticks_to_stop` consecutive silent ticks, at which point the
/// render loop drops its guard and cancels timers until activity resumes.
pub struct Standby {
    silence_ticks_to_stop: u32,
    consecutive_silent: u32,
    stopped: bool,
}

impl Standby {
    /// Build a Standby effect that reaches `ALL_STOP` after `ticks` silent
    /// frames in a row.
    #[must_use]
    pub fn new(ticks: u32) -> Self {
        Self {
            silence_ticks_to_stop: ticks,
            consecutive_silent: 0,
            stopped: false,
        }
    }

    /// Whether Standby has reached `ALL_STOP` (render loop should drop its
    /// guard and cancel timers until activity resumes).
    #[must_use]
    pub fn is_all_stopped(&self) -> bool {
        self.stopped
    }
}

impl FxEffect for Standby {
    fn kind(&self) -> FxKind {
        FxKind::Standby
    }

    fn tick(&mut self, peaks: Option<&[ChannelPeaks; 2]>) -> (DmxState, bool) {
        match peaks {
            Some(p) if p.iter().any(|c| c.dominant().is_some()) => {
                self.consecutive_silent = 0;
                self.stopped = false;
                ([0u8; 16], true) // finished: audio resumed, switch out
            }
            _ => {
                self.consecutive_silent += 1;
                if self.consecutive_silent >= self.silence_ticks_to_stop {
                    self.stopped = true;
                }
                ([0u8; 16], false)
            }
        }
    }

    fn suggested_fx_next(&self) -> FxKind {
        FxKind::MajorPeak
    }

    fn reset(&mut self) {
        self.consecutive_silent = 0;
        self.stopped = false;
    }

    fn all_stopped(&self) -> bool {
        self.stopped
    }
}

/// Maps the dominant spectral peak on each channel to a brightness/color
/// DMX state. A simple, teachable mapping: magnitude to brightness
/// (channels 0/1), frequency band to a coarse hue bucket (channels 2/3).
pub struct MajorPeak {
    max_magnitude_seen: f32,
}

impl MajorPeak {
    /// Build a fresh `MajorPeak` effect.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_magnitude_seen: 1.0,
        }
    }

    fn brightness(&mut self, magnitude: f32) -> u8 {
        self.max_magnitude_seen = self.max_magnitude_seen.max(magnitude);
        let ratio = (magnitude / self.max_magnitude_seen).clamp(0.0, 1.0);
        (ratio * 255.0) as u8
    }

    fn hue_bucket(frequency_hz: f32) -> u8 {
        // Coarse log-scale bucket: bass -> warm, treble -> cool.
        let bucket = (frequency_hz.max(20.0).log2() * 16.0) as u32;
        (bucket % 256) as u8
    }
}

impl Default for MajorPeak {
    fn default() -> Self {
        Self::new()
    }
}

impl FxEffect for MajorPeak {
    fn kind(&self) -> FxKind {
        FxKind::MajorPeak
    }

    fn tick(&mut self, peaks: Option<&[ChannelPeaks; 2]>) -> (DmxState, bool) {
        let Some(peaks) = peaks else {
            return ([0u8; 16], true); // finished: no audio, switch to Standby
        };
        let left = peaks[0].dominant();
        let right = peaks[1].dominant();
        if left.is_none() && right.is_none() {
            return ([0u8; 16], true);
        }

        let mut state = [0u8; 16];
        if let Some(p) = left {
            state[0] = self.brightness(p.magnitude);
            state[2] = Self::hue_bucket(p.frequency_hz);
        }
        if let Some(p) = right {
            state[1] = self.brightness(p.magnitude);
            state[3] = Self::hue_bucket(p.frequency_hz);
        }
        (state, false)
    }

    fn suggested_fx_next(&self) -> FxKind {
        FxKind::Standby
    }

    fn reset(&mut self) {
        self.max_magnitude_seen = 1.0;
    }
}
