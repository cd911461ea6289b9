//! Probe diagnostics classification, first-match-wins.
//!
//! Rules are evaluated top to bottom against the lowercased diagnostic text
//! and the first rule with a matching pattern decides the category. A
//! deadline overrun short-circuits before any text is looked at, and a
//! failure that matches nothing falls back to `unknown_error`.

use crate::domain::HealthStatus;

/// Ordered `(category, patterns)` table. Order is priority.
pub const CLASSIFICATION_RULES: &[(HealthStatus, &[&str])] = &[
    (HealthStatus::Unauthorised, &["401", "unauthorised"]),
    (HealthStatus::NotFound, &["404"]),
    (
        HealthStatus::InvalidUrl,
        &["port missing in uri", "invalid argument"],
    ),
    (
        HealthStatus::Unreachable,
        &[
            "connection refused",
            "no route to host",
            "timed out",
            "could not resolve",
        ],
    ),
    (
        HealthStatus::StreamError,
        &["could not find codec", "invalid data"],
    ),
];

/// Classify the diagnostics of a failed probe.
///
/// Never returns `healthy`, `timed_out` or `queue_error`.
pub fn classify_failure(diagnostics: &str) -> HealthStatus {
    let text = diagnostics.to_lowercase();

    for (status, patterns) in CLASSIFICATION_RULES {
        if patterns.iter().any(|p| text.contains(p)) {
            return *status;
        }
    }

    HealthStatus::UnknownError
}

/// Classify a finished (or killed) probe.
///
/// Priority: deadline overrun, then successful exit, then the failure table.
pub fn classify(diagnostics: &str, timed_out: bool, success: bool) -> HealthStatus {
    if timed_out {
        return HealthStatus::TimedOut;
    }
    if success {
        return HealthStatus::Healthy;
    }
    classify_failure(diagnostics)
}
