//! Per-stream results and the report of one health-check run.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use streamwatch_inventory::Stream;
use uuid::Uuid;

use super::status::HealthStatus;

/// Outcome of probing one stream.
///
/// `detail` carries the raw probe diagnostics and is only retained for
/// non-healthy results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResult {
    pub stream_id: i64,
    pub name: String,
    pub status: HealthStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl HealthResult {
    /// Build a result for `stream`, dropping `detail` when the status is
    /// healthy or the text is blank.
    pub fn new(stream: &Stream, status: HealthStatus, detail: Option<String>) -> Self {
        let detail = if status.is_healthy() {
            None
        } else {
            detail.filter(|d| !d.trim().is_empty())
        };

        Self {
            stream_id: stream.id,
            name: stream.name.clone(),
            status,
            detail,
        }
    }

    pub fn healthy(stream: &Stream) -> Self {
        Self::new(stream, HealthStatus::Healthy, None)
    }

    pub fn failed(stream: &Stream, status: HealthStatus, detail: impl Into<String>) -> Self {
        Self::new(stream, status, Some(detail.into()))
    }

    pub fn is_healthy(&self) -> bool {
        self.status.is_healthy()
    }
}

impl std::fmt::Display for HealthResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ID: {}, Name: {}, Status: {}",
            self.stream_id, self.name, self.status
        )
    }
}

/// Everything produced by one run of the coordinator.
///
/// `results` holds exactly one entry per submitted stream, in arrival order
/// (which carries no meaning).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Number of streams submitted to the run.
    pub submitted: usize,
    pub results: Vec<HealthResult>,
}

impl RunReport {
    /// Whether every submitted stream produced a result.
    pub fn is_complete(&self) -> bool {
        self.results.len() == self.submitted
    }

    /// Number of results with the given status.
    pub fn count(&self, status: HealthStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn healthy_count(&self) -> usize {
        self.count(HealthStatus::Healthy)
    }

    pub fn unhealthy_count(&self) -> usize {
        self.results.len() - self.healthy_count()
    }

    /// Result counts keyed by status; statuses with no results are omitted.
    pub fn status_counts(&self) -> BTreeMap<HealthStatus, usize> {
        let mut counts = BTreeMap::new();
        for result in &self.results {
            *counts.entry(result.status).or_insert(0) += 1;
        }
        counts
    }

    /// Look up the result for a stream id.
    pub fn result_for(&self, stream_id: i64) -> Option<&HealthResult> {
        self.results.iter().find(|r| r.stream_id == stream_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream() -> Stream {
        Stream::new(12, "Front door", "rtsp://door")
    }

    #[test]
    fn test_display_line_format() {
        let result = HealthResult::failed(&stream(), HealthStatus::Unreachable, "No route to host");
        assert_eq!(
            result.to_string(),
            "ID: 12, Name: Front door, Status: unreachable"
        );
    }

    #[test]
    fn test_healthy_result_drops_detail() {
        let result = HealthResult::new(&stream(), HealthStatus::Healthy, Some("noise".into()));
        assert!(result.detail.is_none());
    }

    #[test]
    fn test_blank_detail_is_dropped() {
        let result = HealthResult::failed(&stream(), HealthStatus::UnknownError, "  \n");
        assert!(result.detail.is_none());
    }

    #[test]
    fn test_failed_result_keeps_detail() {
        let result = HealthResult::failed(&stream(), HealthStatus::NotFound, "404 Not Found");
        assert_eq!(result.detail.as_deref(), Some("404 Not Found"));
    }

    #[test]
    fn test_report_counts() {
        let s = stream();
        let report = RunReport {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            duration_ms: 5,
            submitted: 3,
            results: vec![
                HealthResult::healthy(&s),
                HealthResult::failed(&s, HealthStatus::TimedOut, ""),
                HealthResult::failed(&s, HealthStatus::TimedOut, ""),
            ],
        };

        assert!(report.is_complete());
        assert_eq!(report.healthy_count(), 1);
        assert_eq!(report.unhealthy_count(), 2);
        assert_eq!(report.status_counts().get(&HealthStatus::TimedOut), Some(&2));
        assert_eq!(report.status_counts().get(&HealthStatus::QueueError), None);
    }
}
