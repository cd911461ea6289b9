//! In-memory fakes for the probe and sink seams (testing only)
//!
//! `ScriptedProbe` replays a per-stream script instead of spawning processes
//! and records how many probes ran at once. `MemorySink` keeps every
//! delivered report.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use streamwatch_inventory::Stream;

use crate::domain::{HealthResult, RunReport};
use crate::probe::{ProbeExecutor, ProbeOutcome};
use crate::sink::ResultSink;

// ---------------------------------------------------------------------------
// ScriptedProbe
// ---------------------------------------------------------------------------

/// What a scripted probe does for one stream.
#[derive(Debug, Clone)]
pub enum ScriptedStep {
    Healthy,
    HealthyAfter(Duration),
    /// Exit non-zero with this diagnostic output.
    Fail(String),
    /// Never finish on its own; killed at the deadline.
    Hang,
    Panic,
}

/// Probe executor driven by a script keyed on stream id.
#[derive(Debug)]
pub struct ScriptedProbe {
    deadline: Duration,
    default: ScriptedStep,
    steps: HashMap<i64, ScriptedStep>,
    active: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
    probed: Mutex<Vec<i64>>,
}

impl ScriptedProbe {
    /// Every stream is healthy unless scripted otherwise.
    pub fn new(deadline: Duration) -> Self {
        Self {
            deadline,
            default: ScriptedStep::Healthy,
            steps: HashMap::new(),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            probed: Mutex::new(Vec::new()),
        }
    }

    pub fn with_default(mut self, step: ScriptedStep) -> Self {
        self.default = step;
        self
    }

    pub fn with_step(mut self, stream_id: i64, step: ScriptedStep) -> Self {
        self.steps.insert(stream_id, step);
        self
    }

    /// Highest number of probes observed running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Stream ids in the order their probes started.
    pub fn probed(&self) -> Vec<i64> {
        self.probed.lock().unwrap().clone()
    }

    fn step_for(&self, stream_id: i64) -> ScriptedStep {
        self.steps
            .get(&stream_id)
            .unwrap_or(&self.default)
            .clone()
    }
}

struct ActiveSlot<'a>(&'a AtomicUsize);

impl Drop for ActiveSlot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn exited(output: &str, success: bool, elapsed: Duration) -> ProbeOutcome {
    ProbeOutcome {
        output: output.to_string(),
        timed_out: false,
        success,
        exit_code: Some(if success { 0 } else { 1 }),
        elapsed,
    }
}

#[async_trait]
impl ProbeExecutor for ScriptedProbe {
    async fn probe(&self, stream: &Stream) -> HealthResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.probed.lock().unwrap().push(stream.id);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _slot = ActiveSlot(&self.active);

        let started = Instant::now();
        let outcome = match self.step_for(stream.id) {
            ScriptedStep::Healthy => exited("", true, started.elapsed()),
            ScriptedStep::HealthyAfter(delay) => {
                tokio::time::sleep(delay).await;
                exited("", true, started.elapsed())
            }
            ScriptedStep::Fail(output) => exited(&output, false, started.elapsed()),
            ScriptedStep::Hang => {
                tokio::time::sleep(self.deadline).await;
                ProbeOutcome::timed_out(started.elapsed())
            }
            ScriptedStep::Panic => panic!("scripted panic for stream {}", stream.id),
        };
        outcome.into_result(stream)
    }
}

// ---------------------------------------------------------------------------
// MemorySink
// ---------------------------------------------------------------------------

/// Sink that stores every delivered report.
#[derive(Debug, Default)]
pub struct MemorySink {
    reports: Mutex<Vec<RunReport>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<RunReport> {
        self.reports.lock().unwrap().clone()
    }
}

impl ResultSink for MemorySink {
    fn deliver(&self, report: &RunReport) -> io::Result<()> {
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }
}
