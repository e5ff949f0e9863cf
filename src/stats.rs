//! Observability sink for the counters and gauges the render/DMX/Racked
//! paths produce.
//!
//! spec.md's Non-goals name "metrics" as external scope, but an ambient
//! logging-based observability layer still ships: [`StatsSink`] is a narrow
//! trait so the concrete backend (a real metrics exporter keyed off
//! `stats.db_uri`, or just `tracing` events) is swappable without the
//! render loop, Racked, or the DMX link depending on it directly.

use std::sync::Arc;

/// A narrow counter/gauge sink. Implementations must be cheap to call from
/// a hot path (packet intake, render tick) — no blocking I/O.
pub trait StatsSink: Send + Sync {
    /// Increment a named counter by `value`.
    fn record_counter(&self, name: &str, value: u64);
    /// Record a named gauge's current value.
    fn record_gauge(&self, name: &str, value: f64);
}

/// Default [`StatsSink`] that emits `tracing` events, so counters are
/// visible in logs with zero extra dependencies when `stats.db_uri` is
/// unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingStatsSink;

impl StatsSink for TracingStatsSink {
    fn record_counter(&self, name: &str, value: u64) {
        tracing::debug!(counter = name, value, "stat");
    }

    fn record_gauge(&self, name: &str, value: f64) {
        tracing::debug!(gauge = name, value, "stat");
    }
}

/// A shared handle to a [`StatsSink`], the form every subsystem stores.
pub type SharedStats = Arc<dyn StatsSink>;

/// Build the default [`TracingStatsSink`] as a [`SharedStats`] handle.
#[must_use]
pub fn default_stats() -> SharedStats {
    Arc::new(TracingStatsSink)
}
