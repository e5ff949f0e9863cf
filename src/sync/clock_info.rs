//! The record layout published by the external PTP helper.

/// Version tag the Clock Bridge expects at the head of the shared-memory
/// record. A mismatch is a fatal process error — it means the helper and
/// this receiver disagree on the record's shape.
pub const EXPECTED_VERSION: u32 = 3;

/// A snapshot copied out of the PTP helper's shared-memory record.
///
/// The underlying memory begins with a `pthread_mutex_t` (opaque to us
/// beyond needing to lock/unlock it), then this data in order: version,
/// `master_clock_id`, a fixed-width master IP string, `local_time`,
/// `local_to_master_time_offset`, `master_clock_start_time`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockInfo {
    /// Identifier of the current PTP master clock.
    pub clock_id: u64,
    /// IP address of the current PTP master, as reported by the helper.
    pub master_ip: [u8; 4],
    /// Local monotonic time (ns) at which this sample was taken.
    pub sample_time_ns: u64,
    /// Offset (ns) to add to local time to obtain master time.
    pub raw_offset_ns: i64,
    /// Local monotonic time (ns) at which the current master achieved
    /// mastership.
    pub mastership_start_ns: u64,
}

/// Fixed byte layout of the shared-memory record body, after the embedded
/// mutex. Matches the field order documented on [`ClockInfo`].
pub(super) const RECORD_LEN: usize = 4 + 8 + 4 + 8 + 8 + 8;

impl ClockInfo {
    /// Parse a `ClockInfo` out of the raw record bytes (post-mutex, starting
    /// at the version tag). Returns `None` if the version doesn't match
    /// [`EXPECTED_VERSION`] or the buffer is too short.
    #[must_use]
    pub fn parse(record: &[u8]) -> Option<Self> {
        if record.len() < RECORD_LEN {
            return None;
        }
        let version = u32::from_ne_bytes(record[0..4].try_into().ok()?);
        if version != EXPECTED_VERSION {
            return None;
        }
        let clock_id = u64::from_ne_bytes(record[4..12].try_into().ok()?);
        let mut master_ip = [0u8; 4];
        master_ip.copy_from_slice(&record[12..16]);
        let sample_time_ns = u64::from_ne_bytes(record[16..24].try_into().ok()?);
        let raw_offset_ns = i64::from_ne_bytes(record[24..32].try_into().ok()?);
        let mastership_start_ns = u64::from_ne_bytes(record[32..40].try_into().ok()?);
        Some(Self {
            clock_id,
            master_ip,
            sample_time_ns,
            raw_offset_ns,
            mastership_start_ns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(version: u32, info: &ClockInfo) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&version.to_ne_bytes());
        buf.extend_from_slice(&info.clock_id.to_ne_bytes());
        buf.extend_from_slice(&info.master_ip);
        buf.extend_from_slice(&info.sample_time_ns.to_ne_bytes());
        buf.extend_from_slice(&info.raw_offset_ns.to_ne_bytes());
        buf.extend_from_slice(&info.mastership_start_ns.to_ne_bytes());
        buf
    }

    #[test]
    fn parses_well_formed_record() {
        let info = ClockInfo {
            clock_id: 42,
            master_ip: [10, 0, 0, 1],
            sample_time_ns: 1_000_000,
            raw_offset_ns: -500,
            mastership_start_ns: 100,
        };
        let buf = encode(EXPECTED_VERSION, &info);
        assert_eq!(ClockInfo::parse(&buf), Some(info));
    }

    #[test]
    fn rejects_version_mismatch() {
        let info = ClockInfo {
            clock_id: 1,
            master_ip: [0; 4],
            sample_time_ns: 0,
            raw_offset_ns: 0,
            mastership_start_ns: 0,
        };
        let buf = encode(EXPECTED_VERSION + 1, &info);
        assert_eq!(ClockInfo::parse(&buf), None);
    }
}
