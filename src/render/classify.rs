//! Ready/Future/Outdated classification of a frame's target play-time
//! against the local monotonic clock.

use std::time::Duration;

/// How a frame's target play-time relates to "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayTimeClass {
    /// Target play-time falls within `[now, now + lead_time]`.
    Ready,
    /// Target play-time is further out than `lead_time`.
    Future,
    /// Target play-time has already passed (beyond a small negative
    /// threshold).
    Outdated,
}

/// Small negative tolerance before a frame counts as `Outdated`, so a frame
/// whose target just barely elapsed during scheduling jitter still renders.
pub const OUTDATED_TOLERANCE: Duration = Duration::from_millis(2);

/// Classify `target_ns` (local monotonic nanoseconds) relative to `now_ns`
/// and the configured `lead_time`.
#[must_use]
pub fn classify(target_ns: i128, now_ns: i128, lead_time: Duration) -> PlayTimeClass {
    let lead_ns = lead_time.as_nanos() as i128;
    let tolerance_ns = OUTDATED_TOLERANCE.as_nanos() as i128;
    let delta = target_ns - now_ns;
    if delta < -tolerance_ns {
        PlayTimeClass::Outdated
    } else if delta > lead_ns {
        PlayTimeClass::Future
    } else {
        PlayTimeClass::Ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_window_is_ready() {
        let lead = Duration::from_millis(100);
        assert_eq!(classify(1_000_000_000, 950_000_000, lead), PlayTimeClass::Ready);
    }

    #[test]
    fn far_future_is_future() {
        let lead = Duration::from_millis(100);
        assert_eq!(
            classify(2_000_000_000, 0, lead),
            PlayTimeClass::Future
        );
    }

    #[test]
    fn well_past_is_outdated() {
        let lead = Duration::from_millis(100);
        assert_eq!(
            classify(0, 1_000_000_000, lead),
            PlayTimeClass::Outdated
        );
    }

    #[test]
    fn tiny_negative_delta_within_tolerance_is_ready() {
        let lead = Duration::from_millis(100);
        assert_eq!(classify(999_000_000, 1_000_000_000, lead), PlayTimeClass::Ready);
    }
}
