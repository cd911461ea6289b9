//! Global atomic counters for streamwatch.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (the coordinator does so at the end of each run).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters; no allocations, no locking.
pub struct Metrics {
    runs_completed: AtomicU64,
    probes_executed: AtomicU64,
    probes_timed_out: AtomicU64,
    dispatch_rejections: AtomicU64,
    cycles_skipped: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            runs_completed: AtomicU64::new(0),
            probes_executed: AtomicU64::new(0),
            probes_timed_out: AtomicU64::new(0),
            dispatch_rejections: AtomicU64::new(0),
            cycles_skipped: AtomicU64::new(0),
        }
    }

    pub fn inc_runs_completed(&self) {
        self.runs_completed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "runs_completed", "counter incremented");
    }

    pub fn inc_probes_executed(&self) {
        self.probes_executed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "probes_executed", "counter incremented");
    }

    pub fn inc_probes_timed_out(&self) {
        self.probes_timed_out.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "probes_timed_out", "counter incremented");
    }

    pub fn inc_dispatch_rejections(&self) {
        self.dispatch_rejections.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "dispatch_rejections", "counter incremented");
    }

    pub fn inc_cycles_skipped(&self) {
        self.cycles_skipped.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "cycles_skipped", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            runs_completed = self.runs_completed(),
            probes_executed = self.probes_executed(),
            probes_timed_out = self.probes_timed_out(),
            dispatch_rejections = self.dispatch_rejections(),
            cycles_skipped = self.cycles_skipped(),
        );
    }

    pub fn runs_completed(&self) -> u64 {
        self.runs_completed.load(Ordering::Relaxed)
    }

    pub fn probes_executed(&self) -> u64 {
        self.probes_executed.load(Ordering::Relaxed)
    }

    pub fn probes_timed_out(&self) -> u64 {
        self.probes_timed_out.load(Ordering::Relaxed)
    }

    pub fn dispatch_rejections(&self) -> u64 {
        self.dispatch_rejections.load(Ordering::Relaxed)
    }

    pub fn cycles_skipped(&self) -> u64 {
        self.cycles_skipped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_increment_independently() {
        let m = Metrics::new();
        m.inc_probes_executed();
        m.inc_probes_executed();
        m.inc_probes_timed_out();
        m.inc_dispatch_rejections();

        assert_eq!(m.probes_executed(), 2);
        assert_eq!(m.probes_timed_out(), 1);
        assert_eq!(m.dispatch_rejections(), 1);
        assert_eq!(m.runs_completed(), 0);
        assert_eq!(m.cycles_skipped(), 0);
    }

    #[test]
    fn test_flush_does_not_reset() {
        let m = Metrics::new();
        m.inc_runs_completed();
        m.flush();
        assert_eq!(m.runs_completed(), 1);
    }
}
