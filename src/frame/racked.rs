//! Closed reels plus one work-in-progress reel: the buffer the render loop
//! drains and the RTSP control path flushes.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::warn;

use super::flush_info::{FlushInfo, FlushKind};
use super::frame::Frame;
use super::reel::{REEL_CAPACITY, Reel};
use crate::stats::{SharedStats, default_stats};

/// Grace period after which an incomplete WIP reel is closed early so sparse
/// input doesn't starve the render loop.
pub const WIP_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Reel count above which Racked logs a back-pressure warning. Frames are
/// never dropped for being over this mark; the render loop is the only
/// consumer-side rate limiter.
pub const HIGH_WATER_MARK: usize = 400;

/// How long `flush` waits to acquire Racked's lock before giving up. Per
/// spec.md §5/§7: flush arbitrates against handoff/consume with a bounded
/// try-lock rather than blocking indefinitely; a timeout records a stat and
/// leaves the WIP reel unchanged rather than retrying.
pub const FLUSH_LOCK_TIMEOUT: Duration = Duration::from_millis(50);

/// Configuration knobs for [`Racked`].
#[derive(Debug, Clone, Copy)]
pub struct RackedConfig {
    /// Frames per reel before it closes automatically.
    pub reel_capacity: usize,
    /// Max age of an incomplete WIP reel before forced closure.
    pub wip_grace_period: Duration,
    /// Reel count that triggers the back-pressure warning.
    pub high_water_mark: usize,
}

impl Default for RackedConfig {
    fn default() -> Self {
        Self {
            reel_capacity: REEL_CAPACITY,
            wip_grace_period: WIP_GRACE_PERIOD,
            high_water_mark: HIGH_WATER_MARK,
        }
    }
}

struct Inner {
    reels: BTreeMap<u64, Reel>,
    wip: Reel,
    wip_opened_at: Instant,
    next_serial: u64,
    pending_flush: Option<FlushInfo>,
    first_frame_delivered: bool,
    silent_seq: u32,
    silent_ts: u32,
}

/// The process-wide audio buffer: closed reels ordered by serial number plus
/// one growing WIP reel. Producer (packet intake) and consumer (render loop)
/// share it through an internal mutex.
pub struct Racked {
    inner: Mutex<Inner>,
    config: RackedConfig,
    samples_per_packet: u32,
    stats: SharedStats,
}

impl Racked {
    /// Create an empty Racked buffer for a stream with the given nominal
    /// samples-per-packet (used to advance the synthetic silent timestamp).
    #[must_use]
    pub fn new(config: RackedConfig, samples_per_packet: u32) -> Self {
        Self {
            inner: Mutex::new(Inner {
                reels: BTreeMap::new(),
                wip: Reel::new(0),
                wip_opened_at: Instant::now(),
                next_serial: 1,
                pending_flush: None,
                first_frame_delivered: false,
                silent_seq: 0,
                silent_ts: 0,
            }),
            config,
            samples_per_packet,
            stats: default_stats(),
        }
    }

    /// Replace the default [`crate::stats::TracingStatsSink`] with a custom
    /// [`SharedStats`] handle (e.g. one backed by `stats.db_uri`).
    #[must_use]
    pub fn with_stats(mut self, stats: SharedStats) -> Self {
        self.stats = stats;
        self
    }

    /// Hand a freshly decoded frame to Racked. If an active flush matches
    /// the frame it is discarded immediately; otherwise it joins the WIP
    /// reel, which is closed (and a fresh one opened) once it reaches
    /// capacity or has aged past the grace period.
    pub async fn handoff(&self, mut frame: Frame) {
        let mut inner = self.inner.lock().await;
        if let Some(flush) = inner.pending_flush {
            if flush.active && flush.matches(&frame) {
                frame.mark_flushed();
                return;
            }
        }
        inner.first_frame_delivered = true;
        inner.wip.push(frame);
        let capacity = self.config.reel_capacity;
        let aged_out = inner.wip_opened_at.elapsed() > self.config.wip_grace_period;
        if inner.wip.full(capacity) || (aged_out && !inner.wip.is_empty()) {
            Self::close_wip_locked(&mut inner);
        }
        if inner.reels.len() > self.config.high_water_mark {
            warn!(
                reel_count = inner.reels.len(),
                "racked reel count exceeds high-water mark"
            );
            self.stats
                .record_gauge("racked.reel_count", inner.reels.len() as f64);
        }
    }

    fn close_wip_locked(inner: &mut Inner) {
        if inner.wip.is_empty() {
            inner.wip_opened_at = Instant::now();
            return;
        }
        let serial = inner.next_serial;
        inner.next_serial += 1;
        let closed = std::mem::replace(&mut inner.wip, Reel::new(serial));
        inner.reels.insert(serial, closed);
        inner.wip_opened_at = Instant::now();
    }

    /// Consume the next frame in playback order.
    ///
    /// If no reels are racked (and none pending in WIP old enough to force
    /// closure), a synthesized [`Frame::new_silent`] is returned instead so
    /// the render loop's cadence never stalls.
    pub async fn next_frame(&self) -> Frame {
        let mut inner = self.inner.lock().await;
        let capacity = self.config.reel_capacity;
        let aged_out = inner.wip_opened_at.elapsed() > self.config.wip_grace_period;
        if aged_out && !inner.wip.is_empty() {
            Self::close_wip_locked(&mut inner);
        }
        if let Some((&serial, _)) = inner.reels.iter().next() {
            let reel = inner.reels.get_mut(&serial).expect("serial present");
            let frame = reel.pop_front();
            if reel.is_empty() {
                inner.reels.remove(&serial);
            }
            if let Some(frame) = frame {
                let _ = capacity;
                return frame;
            }
        }
        let seq = inner.silent_seq;
        inner.silent_seq = inner.silent_seq.wrapping_add(1);
        let ts = inner.silent_ts;
        inner.silent_ts = inner.silent_ts.wrapping_add(self.samples_per_packet);
        Frame::new_silent(seq, ts)
    }

    /// Whether any real (non-synthetic) frame has been delivered to Racked
    /// since the last complete flush.
    pub async fn first_frame_delivered(&self) -> bool {
        self.inner.lock().await.first_frame_delivered
    }

    /// Apply a flush. If the flush's bounds cover the entire racked range it
    /// is applied in one step by clearing everything; otherwise each reel is
    /// scanned and matching frames dropped, removing reels left empty.
    /// `kind == FlushKind::Complete`/`Inactive` also resets first-frame
    /// tracking so the render loop resumes emitting Silent frames.
    ///
    /// Waits at most [`FLUSH_LOCK_TIMEOUT`] for the lock; on timeout records
    /// a `racked.flush_try_lock_timeout` stat and returns with the WIP reel
    /// untouched, per spec.md §7 ("Flush: try-lock timeout → record stat;
    /// leave wip unchanged").
    pub async fn flush(&self, info: FlushInfo) {
        let mut inner = match tokio::time::timeout(FLUSH_LOCK_TIMEOUT, self.inner.lock()).await {
            Ok(guard) => guard,
            Err(_) => {
                warn!("racked flush try-lock timed out, leaving wip unchanged");
                self.stats.record_counter("racked.flush_try_lock_timeout", 1);
                return;
            }
        };

        let whole_range_covered = info.kind == FlushKind::All || {
            let racked_min = inner.reels.values().filter_map(Reel::first_seq).min();
            let racked_max = inner
                .reels
                .values()
                .filter_map(Reel::last_seq)
                .max()
                .max(inner.wip.last_seq());
            match (racked_min, racked_max) {
                (Some(min), Some(max)) => {
                    let probe_min = Frame::new_header_parsed(min, 0, 0);
                    let probe_max = Frame::new_header_parsed(max, 0, 0);
                    info.matches(&probe_min) && info.matches(&probe_max)
                }
                _ => true,
            }
        };

        if whole_range_covered {
            inner.reels.clear();
            inner.wip = Reel::new(inner.next_serial);
            inner.wip_opened_at = Instant::now();
        } else {
            let mut empty = Vec::new();
            for (serial, reel) in inner.reels.iter_mut() {
                reel.retain_discarding(|f| info.matches(f));
                if reel.is_empty() {
                    empty.push(*serial);
                }
            }
            for serial in empty {
                inner.reels.remove(&serial);
            }
            inner.wip.retain_discarding(|f| info.matches(f));
        }

        if matches!(info.kind, FlushKind::Complete | FlushKind::Inactive) {
            inner.first_frame_delivered = false;
            inner.silent_seq = 0;
            inner.silent_ts = 0;
        }

        if info.active && info.kind != FlushKind::All {
            inner.pending_flush = Some(info);
        } else {
            inner.pending_flush = None;
        }
    }

    /// Clear any still-pending (in-flight) flush so new frames are admitted
    /// unconditionally again.
    pub async fn clear_pending_flush(&self) {
        self.inner.lock().await.pending_flush = None;
    }

    /// Number of closed reels currently racked (for stats/logging).
    pub async fn reel_count(&self) -> usize {
        self.inner.lock().await.reels.len()
    }
}
