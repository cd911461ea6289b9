//! Closed set of health categories a probe can end in.

use serde::{Deserialize, Serialize};

/// Health classification of one stream in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Probe exited successfully after decoding a frame.
    Healthy,
    /// Probe did not exit before its deadline and was killed.
    TimedOut,
    /// Stream rejected the credentials.
    Unauthorised,
    /// Stream path does not exist on the device.
    NotFound,
    /// Source URL is malformed.
    InvalidUrl,
    /// Host could not be reached or resolved.
    Unreachable,
    /// Stream connected but its data could not be decoded.
    StreamError,
    /// Probe failed with diagnostics no rule recognises.
    UnknownError,
    /// The stream was never probed because the pool rejected it.
    QueueError,
}

impl HealthStatus {
    /// Every category, in declaration order.
    pub const ALL: [HealthStatus; 9] = [
        HealthStatus::Healthy,
        HealthStatus::TimedOut,
        HealthStatus::Unauthorised,
        HealthStatus::NotFound,
        HealthStatus::InvalidUrl,
        HealthStatus::Unreachable,
        HealthStatus::StreamError,
        HealthStatus::UnknownError,
        HealthStatus::QueueError,
    ];

    /// Stable snake_case name, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::TimedOut => "timed_out",
            HealthStatus::Unauthorised => "unauthorised",
            HealthStatus::NotFound => "not_found",
            HealthStatus::InvalidUrl => "invalid_url",
            HealthStatus::Unreachable => "unreachable",
            HealthStatus::StreamError => "stream_error",
            HealthStatus::UnknownError => "unknown_error",
            HealthStatus::QueueError => "queue_error",
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
