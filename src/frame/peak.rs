//! Per-channel spectral peak extraction.

/// A single local maximum in a channel's FFT magnitude spectrum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    /// Center frequency of the peak, in Hz.
    pub frequency_hz: f32,
    /// Linear magnitude at the peak bin.
    pub magnitude: f32,
}

/// Peaks found on one audio channel of a single frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelPeaks {
    /// Peaks ordered by descending magnitude.
    pub peaks: Vec<Peak>,
}

impl ChannelPeaks {
    /// The strongest peak found on this channel, if any.
    #[must_use]
    pub fn dominant(&self) -> Option<Peak> {
        self.peaks.first().copied()
    }
}

/// Locate local maxima in a real-valued magnitude spectrum and convert bin
/// indices to frequencies.
///
/// `magnitudes` holds the non-negative-frequency half of an FFT's magnitude
/// output (length = `fft_size / 2 + 1`). A bin is a local maximum if it is
/// strictly greater than both neighbors and above `threshold`. Results are
/// sorted by descending magnitude and truncated to `max_peaks`.
#[must_use]
pub fn find_peaks(
    magnitudes: &[f32],
    sample_rate: u32,
    fft_size: usize,
    threshold: f32,
    max_peaks: usize,
) -> Vec<Peak> {
    if magnitudes.len() < 3 || fft_size == 0 {
        return Vec::new();
    }
    let bin_hz = sample_rate as f32 / fft_size as f32;
    let mut peaks: Vec<Peak> = Vec::new();
    for i in 1..magnitudes.len() - 1 {
        let m = magnitudes[i];
        if m <= threshold {
            continue;
        }
        if m > magnitudes[i - 1] && m > magnitudes[i + 1] {
            peaks.push(Peak {
                frequency_hz: i as f32 * bin_hz,
                magnitude: m,
            });
        }
    }
    peaks.sort_by(|a, b| b.magnitude.partial_cmp(&a.magnitude).unwrap_or(std::cmp::Ordering::Equal));
    peaks.truncate(max_peaks);
    peaks
}

/// Energy-based silence test: true iff the sum of peak magnitudes on both
/// channels falls below `threshold`.
#[must_use]
pub fn channels_are_silent(left: &ChannelPeaks, right: &ChannelPeaks, threshold: f32) -> bool {
    let energy = |c: &ChannelPeaks| c.peaks.iter().map(|p| p.magnitude).sum::<f32>();
    energy(left) < threshold && energy(right) < threshold
}
