//! ffmpeg-based probe: decode one frame from the stream and throw it away.

use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use streamwatch_inventory::Stream;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

use super::{ProbeExecutor, ProbeOutcome};
use crate::config::ProbeConfig;
use crate::domain::{HealthResult, HealthStatus};

/// Upper bound on captured diagnostics per pipe. Anything past this is read
/// and discarded so the child never blocks on a full pipe.
const MAX_CAPTURE_BYTES: usize = 64 * 1024;

/// Fixed argument profile appended after the configured command prefix.
///
/// Banner off, errors only, RTSP over TCP, stream-connect timeout in
/// microseconds, exactly one video frame, decoded output discarded.
pub fn build_probe_args(source_url: &str, connect_timeout_us: u64) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-rtsp_transport".to_string(),
        "tcp".to_string(),
        "-timeout".to_string(),
        connect_timeout_us.to_string(),
        "-i".to_string(),
        source_url.to_string(),
        "-frames:v".to_string(),
        "1".to_string(),
        "-f".to_string(),
        "null".to_string(),
        "-".to_string(),
    ]
}

/// Production executor: one ffmpeg process per probe, killed at the deadline.
#[derive(Debug, Clone)]
pub struct FfmpegProbe {
    config: ProbeConfig,
}

impl FfmpegProbe {
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    fn command_for(&self, stream: &Stream) -> std::io::Result<Command> {
        let (program, prefix) = self.config.command.split_first().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "probe command is empty")
        })?;

        let mut cmd = Command::new(program);
        cmd.args(prefix)
            .args(build_probe_args(
                &stream.source_url,
                self.config.connect_timeout_us(),
            ))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        Ok(cmd)
    }

    /// Spawn the probe and wait for it, up to the deadline.
    ///
    /// Returns `Err` only when the process could not be spawned or waited on.
    /// The child is killed and reaped on every path: deadline, wait error, or
    /// this future being dropped. Output still open after the child exits
    /// (a forked descendant holding the pipes) is drained only until the same
    /// deadline; whatever arrived by then is classified.
    pub async fn run(&self, stream: &Stream) -> std::io::Result<ProbeOutcome> {
        let start = Instant::now();
        let deadline = tokio::time::Instant::now() + self.config.deadline();
        let mut child = self.command_for(stream)?.spawn()?;

        let stdout_buf = CaptureBuffer::default();
        let stderr_buf = CaptureBuffer::default();
        let mut stdout_task = tokio::spawn(capture(child.stdout.take(), stdout_buf.clone()));
        let mut stderr_task = tokio::spawn(capture(child.stderr.take(), stderr_buf.clone()));

        let waited = tokio::select! {
            status = child.wait() => Some(status),
            _ = tokio::time::sleep_until(deadline) => None,
        };

        let Some(status) = waited else {
            if let Err(e) = child.kill().await {
                warn!(stream_id = stream.id, error = %e, "failed to kill timed-out probe");
            }
            stdout_task.abort();
            stderr_task.abort();
            debug!(stream_id = stream.id, deadline_ms = self.config.deadline_ms, "probe killed at deadline");
            return Ok(ProbeOutcome::timed_out(start.elapsed()));
        };
        let status = status?;

        let drained = tokio::time::timeout_at(deadline, async {
            let _ = (&mut stdout_task).await;
            let _ = (&mut stderr_task).await;
        })
        .await;
        if drained.is_err() {
            stdout_task.abort();
            stderr_task.abort();
            debug!(stream_id = stream.id, "probe output still open at deadline; using what was read");
        }

        let mut output = stdout_buf.take_string();
        output.push_str(&stderr_buf.take_string());

        Ok(ProbeOutcome {
            output,
            timed_out: false,
            success: status.success(),
            exit_code: status.code(),
            elapsed: start.elapsed(),
        })
    }
}

#[async_trait]
impl ProbeExecutor for FfmpegProbe {
    async fn probe(&self, stream: &Stream) -> HealthResult {
        match self.run(stream).await {
            Ok(outcome) => outcome.into_result(stream),
            Err(e) => HealthResult::failed(
                stream,
                HealthStatus::UnknownError,
                format!("failed to run probe `{}`: {e}", self.config.command.join(" ")),
            ),
        }
    }
}

/// Bytes read from one pipe so far, shared with its reader task.
#[derive(Debug, Clone, Default)]
struct CaptureBuffer(Arc<Mutex<Vec<u8>>>);

impl CaptureBuffer {
    fn extend(&self, bytes: &[u8]) {
        let mut buf = self.0.lock().unwrap_or_else(|e| e.into_inner());
        let room = MAX_CAPTURE_BYTES.saturating_sub(buf.len());
        buf.extend_from_slice(&bytes[..bytes.len().min(room)]);
    }

    fn take_string(&self) -> String {
        let buf = std::mem::take(&mut *self.0.lock().unwrap_or_else(|e| e.into_inner()));
        String::from_utf8_lossy(&buf).into_owned()
    }
}

async fn capture<R>(pipe: Option<R>, sink: CaptureBuffer)
where
    R: AsyncRead + Unpin,
{
    let Some(mut pipe) = pipe else {
        return;
    };

    let mut buf = [0u8; 8192];
    loop {
        match pipe.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => sink.extend(&buf[..n]),
            Err(e) => {
                debug!(error = %e, "probe pipe read failed");
                break;
            }
        }
    }
}
