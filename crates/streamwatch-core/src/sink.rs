//! Presentation of finished runs.
//!
//! Sinks receive a whole [`RunReport`] after the run has completed; workers
//! never write output themselves. Results are rendered in stream id order.

use std::io::{self, Write};
use std::sync::Mutex;

use crate::domain::{HealthResult, RunReport};

/// Destination for finished run reports.
pub trait ResultSink: Send + Sync {
    fn deliver(&self, report: &RunReport) -> io::Result<()>;
}

/// Render one result as a status line, optionally with the first line of
/// its diagnostics.
pub fn render_line(result: &HealthResult, include_detail: bool) -> String {
    let mut line = result.to_string();
    if include_detail {
        if let Some(first) = result
            .detail
            .as_deref()
            .and_then(|d| d.lines().map(str::trim).find(|l| !l.is_empty()))
        {
            line.push_str(", Detail: ");
            line.push_str(first);
        }
    }
    line
}

fn sorted(report: &RunReport) -> Vec<&HealthResult> {
    let mut results: Vec<&HealthResult> = report.results.iter().collect();
    results.sort_by_key(|r| r.stream_id);
    results
}

/// Writes `ID: <id>, Name: <name>, Status: <status>` lines.
pub struct LineSink<W: Write + Send> {
    out: Mutex<W>,
    include_detail: bool,
}

impl<W: Write + Send> LineSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            include_detail: false,
        }
    }

    /// Append the first diagnostic line to non-healthy results.
    pub fn with_detail(mut self, include_detail: bool) -> Self {
        self.include_detail = include_detail;
        self
    }

    /// Consume the sink and return the writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl LineSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ResultSink for LineSink<W> {
    fn deliver(&self, report: &RunReport) -> io::Result<()> {
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        for result in sorted(report) {
            writeln!(out, "{}", render_line(result, self.include_detail))?;
        }
        out.flush()
    }
}

/// Writes one JSON object per result.
pub struct JsonLinesSink<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl JsonLinesSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ResultSink for JsonLinesSink<W> {
    fn deliver(&self, report: &RunReport) -> io::Result<()> {
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        for result in sorted(report) {
            serde_json::to_writer(&mut *out, result)?;
            out.write_all(b"\n")?;
        }
        out.flush()
    }
}
