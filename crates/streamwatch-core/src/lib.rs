//! Streamwatch Core Library
//!
//! Probe a batch of video streams in parallel with a bounded worker pool,
//! classify every failure, and collect exactly one result per stream.
//!
//! ## Key Components
//!
//! - `classifier`: ordered failure-text rules
//! - `probe`: `ProbeExecutor` seam and the ffmpeg implementation
//! - `pool` / `aggregator`: bounded fan-out and completion-barrier fan-in
//! - `coordinator`: one run, start to finish
//! - `scheduler`: one run per interval against an inventory
//! - `sink`: text and JSON-lines presentation of finished runs

pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod fakes;
pub mod metrics;
pub mod obs;
pub mod pool;
pub mod probe;
pub mod scheduler;
pub mod sink;
pub mod telemetry;

pub use aggregator::{CompletionBarrier, Intake};
pub use classifier::{classify, classify_failure};
pub use config::{InventoryConfig, PoolConfig, ProbeConfig, ScheduleConfig, WatchConfig};
pub use coordinator::RunCoordinator;
pub use domain::{
    ConfigError, DispatchError, HealthResult, HealthStatus, Result, RunReport, WatchError,
};
pub use pool::WorkerPool;
pub use probe::{build_probe_args, FfmpegProbe, ProbeExecutor, ProbeOutcome};
pub use scheduler::Scheduler;
pub use sink::{JsonLinesSink, LineSink, ResultSink};

pub use streamwatch_inventory::{InventoryError, InventoryProvider, Stream};

pub use metrics::METRICS;
pub use obs::{emit_run_finished, emit_run_started, run_span};
pub use telemetry::init_tracing;

/// Streamwatch version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
