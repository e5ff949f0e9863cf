//! The mapping between source RTP timestamps and local monotonic time.

use tokio::sync::RwLock;

use super::clock_bridge::ClockBridge;
use super::clock_info::ClockInfo;

/// The data installed by a SETRATEANCHORTIME request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorData {
    /// The RTP timestamp this anchor is referenced to.
    pub rtp_time: u32,
    /// Source-clock nanoseconds at `rtp_time` (derived from
    /// `networkTimeSecs`/`networkTimeFrac`).
    pub network_time_ns: u64,
    /// Timeline identifier the source assigned this anchor.
    pub clock_id: u64,
    /// Rate bit field; bit 0 set means "playing" (spooling into Racked).
    pub rate: u32,
}

impl AnchorData {
    /// Bit 0 of `rate`: whether the source considers the stream playing.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.rate & 0x1 != 0
    }
}

/// Errors converting RTP time to local time.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AnchorError {
    /// No anchor has been installed yet (or it was reset).
    #[error("no anchor installed")]
    NotReady,
}

/// Holds the most recent [`AnchorData`] and converts RTP timestamps to local
/// monotonic nanoseconds using the clock bridge's current offset.
///
/// Guarded by a single `RwLock`: writes happen on SETRATEANCHORTIME, reads
/// happen continuously from the render loop.
pub struct AnchorStore {
    anchor: RwLock<Option<AnchorData>>,
    sample_rate: u32,
}

impl AnchorStore {
    /// Create an empty anchor store for a stream sampled at `sample_rate` Hz.
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        Self {
            anchor: RwLock::new(None),
            sample_rate,
        }
    }

    /// Install a new anchor, replacing whatever was there.
    pub async fn replace(&self, anchor: AnchorData) {
        *self.anchor.write().await = Some(anchor);
    }

    /// Reset to "no anchor installed".
    pub async fn reset(&self) {
        *self.anchor.write().await = None;
    }

    /// Whether the source currently considers the stream playing (anchor
    /// present and its rate bit 0 set).
    pub async fn is_playing(&self) -> bool {
        self.anchor
            .read()
            .await
            .map(|a| a.is_playing())
            .unwrap_or(false)
    }

    /// Convert `rtp_timestamp` to local monotonic nanoseconds using the
    /// current anchor and the clock bridge's `raw_offset_ns`.
    ///
    /// `local_time = anchor.network_time + clock_info.raw_offset`,
    /// `local_time(rtp) = (rtp - anchor.rtp_time) * 1e9 / sample_rate + local_time`.
    ///
    /// # Errors
    /// [`AnchorError::NotReady`] if no anchor is installed.
    pub async fn local_time_ns(
        &self,
        rtp_timestamp: u32,
        clock_info: &ClockInfo,
    ) -> Result<i128, AnchorError> {
        let anchor = self.anchor.read().await.ok_or(AnchorError::NotReady)?;
        Ok(Self::compute(anchor, rtp_timestamp, clock_info, self.sample_rate))
    }

    fn compute(
        anchor: AnchorData,
        rtp_timestamp: u32,
        clock_info: &ClockInfo,
        sample_rate: u32,
    ) -> i128 {
        let anchor_local_ns =
            anchor.network_time_ns as i128 + i128::from(clock_info.raw_offset_ns);
        let delta_samples = i128::from(rtp_timestamp) - i128::from(anchor.rtp_time);
        let delta_ns = delta_samples * 1_000_000_000i128 / i128::from(sample_rate);
        delta_ns + anchor_local_ns
    }

    /// Read back the currently installed anchor, if any.
    pub async fn current(&self) -> Option<AnchorData> {
        *self.anchor.read().await
    }
}

/// Combine [`ClockBridge`] reads with [`AnchorStore`] conversion: the
/// render loop's one-stop call for "what local time does this RTP
/// timestamp correspond to right now".
pub async fn local_time_for(
    anchor: &AnchorStore,
    bridge: &ClockBridge,
    rtp_timestamp: u32,
) -> Result<i128, AnchorTimeError> {
    let clock_info = bridge
        .read_clock_info()
        .map_err(AnchorTimeError::ClockBridge)?;
    anchor
        .local_time_ns(rtp_timestamp, &clock_info)
        .await
        .map_err(AnchorTimeError::Anchor)
}

/// Errors from the combined clock-bridge + anchor-store lookup.
#[derive(Debug, thiserror::Error)]
pub enum AnchorTimeError {
    /// The clock bridge couldn't supply a current `ClockInfo`.
    #[error(transparent)]
    ClockBridge(#[from] super::clock_bridge::ClockBridgeError),
    /// No anchor installed.
    #[error(transparent)]
    Anchor(#[from] AnchorError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(offset_ns: i64) -> ClockInfo {
        ClockInfo {
            clock_id: 1,
            master_ip: [0; 4],
            sample_time_ns: 0,
            raw_offset_ns: offset_ns,
            mastership_start_ns: 0,
        }
    }

    #[tokio::test]
    async fn errors_without_anchor() {
        let store = AnchorStore::new(44100);
        let err = store.local_time_ns(1000, &clock(0)).await.unwrap_err();
        assert_eq!(err, AnchorError::NotReady);
    }

    #[tokio::test]
    async fn one_second_advance_matches_sample_rate() {
        let store = AnchorStore::new(44100);
        store
            .replace(AnchorData {
                rtp_time: 441_000,
                network_time_ns: 100_000_000_000,
                clock_id: 0xABCD,
                rate: 1,
            })
            .await;
        let t0 = store.local_time_ns(441_000, &clock(0)).await.unwrap();
        let t1 = store
            .local_time_ns(441_000 + 44_100, &clock(0))
            .await
            .unwrap();
        assert_eq!(t1 - t0, 1_000_000_000);
        assert!(store.is_playing().await);
    }

    #[tokio::test]
    async fn reset_clears_anchor() {
        let store = AnchorStore::new(44100);
        store
            .replace(AnchorData {
                rtp_time: 0,
                network_time_ns: 0,
                clock_id: 1,
                rate: 1,
            })
            .await;
        store.reset().await;
        assert!(store.current().await.is_none());
    }
}
