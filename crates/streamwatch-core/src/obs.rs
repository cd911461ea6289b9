//! Structured observability hooks for the health-check lifecycle.
//!
//! This module provides:
//! - Run-scoped tracing spans via [`run_span`]
//! - Emission functions for key lifecycle events: run start/finish, probe
//!   finish, dispatch rejection, skipped cycle
//!
//! Events are emitted at `info!` level unless noted (filter with `RUST_LOG`).

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{HealthResult, RunReport};

/// Span tagging every event of one run with its `run_id`.
///
/// Attach with `tracing::Instrument::instrument` so it survives awaits.
pub fn run_span(run_id: &Uuid) -> tracing::Span {
    tracing::info_span!("streamwatch.run", run_id = %run_id)
}

/// Emit event: run started with the number of submitted streams.
pub fn emit_run_started(run_id: &Uuid, streams: usize) {
    info!(event = "run.started", run_id = %run_id, streams = streams);
}

/// Emit event: run finished with duration and health totals.
pub fn emit_run_finished(report: &RunReport) {
    info!(
        event = "run.finished",
        run_id = %report.run_id,
        duration_ms = report.duration_ms,
        submitted = report.submitted,
        results = report.results.len(),
        healthy = report.healthy_count(),
        unhealthy = report.unhealthy_count(),
    );
}

/// Emit event: one probe produced its result (debug level).
pub fn emit_probe_finished(result: &HealthResult, elapsed_ms: u64) {
    debug!(
        event = "probe.finished",
        stream_id = result.stream_id,
        status = %result.status,
        elapsed_ms = elapsed_ms,
    );
}

/// Emit event: the pool rejected a stream (warn level).
pub fn emit_dispatch_rejected(stream_id: i64, error: &dyn std::fmt::Display) {
    warn!(event = "dispatch.rejected", stream_id = stream_id, error = %error);
}

/// Emit event: a cycle was skipped because it could not start (warn level).
pub fn emit_cycle_skipped(error: &dyn std::fmt::Display) {
    warn!(event = "cycle.skipped", error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_run_started_logs_stream_count() {
        emit_run_started(&Uuid::nil(), 7);
        assert!(logs_contain("run.started"));
        assert!(logs_contain("streams=7"));
    }

    #[traced_test]
    #[test]
    fn test_run_finished_logs_totals() {
        let report = RunReport {
            run_id: Uuid::nil(),
            started_at: Utc::now(),
            duration_ms: 12,
            submitted: 0,
            results: vec![],
        };
        emit_run_finished(&report);
        assert!(logs_contain("run.finished"));
        assert!(logs_contain("healthy=0"));
    }

    #[traced_test]
    #[test]
    fn test_dispatch_rejected_is_warning() {
        emit_dispatch_rejected(3, &"probe queue is full");
        assert!(logs_contain("WARN"));
        assert!(logs_contain("dispatch.rejected"));
    }

    #[traced_test]
    #[test]
    fn test_cycle_skipped_logs_error() {
        emit_cycle_skipped(&"missing POSTGRES_PASSWORD");
        assert!(logs_contain("missing POSTGRES_PASSWORD"));
    }

    #[test]
    fn test_run_span_has_name() {
        let span = run_span(&Uuid::nil());
        // Disabled without a subscriber; the metadata is only present when enabled.
        if let Some(meta) = span.metadata() {
            assert_eq!(meta.name(), "streamwatch.run");
        }
    }
}
