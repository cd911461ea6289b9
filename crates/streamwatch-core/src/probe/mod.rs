//! Probe execution.
//!
//! A [`ProbeExecutor`] turns one stream into exactly one [`HealthResult`].
//! Executors never fail: spawn errors, non-zero exits and deadline overruns
//! all come back as non-healthy results.
//!
//! # Modules
//!
//! - [`ffmpeg`]: `FfmpegProbe`, the production executor, and the fixed
//!   argument profile

pub mod ffmpeg;

use std::time::Duration;

use async_trait::async_trait;
use streamwatch_inventory::Stream;

use crate::classifier;
use crate::domain::{HealthResult, HealthStatus};

pub use ffmpeg::{build_probe_args, FfmpegProbe};

/// Runs one probe against one stream.
#[async_trait]
pub trait ProbeExecutor: Send + Sync {
    /// Probe `stream` and classify the outcome.
    async fn probe(&self, stream: &Stream) -> HealthResult;
}

/// What one probe process produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// Captured stdout followed by stderr.
    pub output: String,
    /// The deadline elapsed and the process was killed.
    pub timed_out: bool,
    /// The process exited with status zero.
    pub success: bool,
    /// Exit code, when the process exited on its own.
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
}

impl ProbeOutcome {
    /// Outcome of a process killed at its deadline.
    pub fn timed_out(elapsed: Duration) -> Self {
        Self {
            output: String::new(),
            timed_out: true,
            success: false,
            exit_code: None,
            elapsed,
        }
    }

    pub fn status(&self) -> HealthStatus {
        classifier::classify(&self.output, self.timed_out, self.success)
    }

    /// Convert into the result for `stream`, keeping diagnostics for failures.
    pub fn into_result(self, stream: &Stream) -> HealthResult {
        let status = self.status();
        let detail = match status {
            HealthStatus::Healthy => None,
            HealthStatus::TimedOut => Some(format!(
                "probe did not exit within {} ms and was killed",
                self.elapsed.as_millis()
            )),
            _ if self.output.trim().is_empty() => Some(match self.exit_code {
                Some(code) => format!("probe exited with code {code} and no output"),
                None => "probe was terminated by a signal".to_string(),
            }),
            _ => Some(self.output),
        };
        HealthResult::new(stream, status, detail)
    }
}
