//! One health-check run: fan a batch of streams out to the worker pool and
//! fan every result back in.
//!
//! The coordinator owns nothing between runs besides its configuration and
//! executor. Each call to [`RunCoordinator::run`] builds a fresh barrier,
//! intake, aggregator and pool, and returns once every submitted stream
//! has exactly one result.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use streamwatch_inventory::Stream;
use tracing::{warn, Instrument};
use uuid::Uuid;

use crate::aggregator::{self, CompletionBarrier, Intake};
use crate::config::WatchConfig;
use crate::domain::{ConfigError, HealthResult, HealthStatus, RunReport};
use crate::metrics::METRICS;
use crate::obs;
use crate::pool::WorkerPool;
use crate::probe::{FfmpegProbe, ProbeExecutor};

/// Runs batches of streams through a bounded pool of probes.
pub struct RunCoordinator {
    config: WatchConfig,
    executor: Arc<dyn ProbeExecutor>,
}

impl RunCoordinator {
    /// Validate `config` and pair it with `executor`.
    pub fn new(config: WatchConfig, executor: Arc<dyn ProbeExecutor>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, executor })
    }

    /// Coordinator backed by the ffmpeg probe described in `config.probe`.
    pub fn with_ffmpeg(config: WatchConfig) -> Result<Self, ConfigError> {
        let executor = Arc::new(FfmpegProbe::new(config.probe.clone()));
        Self::new(config, executor)
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Probe every stream and return once all of them have a result.
    pub async fn run(&self, streams: Vec<Stream>) -> RunReport {
        let run_id = Uuid::new_v4();
        let span = obs::run_span(&run_id);
        self.run_inner(run_id, streams).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid, streams: Vec<Stream>) -> RunReport {
        let started_at = Utc::now();
        let clock = Instant::now();
        let submitted = streams.len();
        obs::emit_run_started(&run_id, submitted);

        let results = if streams.is_empty() {
            Vec::new()
        } else {
            warn_on_duplicates(&streams);
            self.fan_out(streams).await
        };

        let report = RunReport {
            run_id,
            started_at,
            duration_ms: clock.elapsed().as_millis() as u64,
            submitted,
            results,
        };
        if !report.is_complete() {
            warn!(
                submitted = report.submitted,
                results = report.results.len(),
                "run finished with missing results"
            );
        }

        obs::emit_run_finished(&report);
        METRICS.inc_runs_completed();
        METRICS.flush();
        report
    }

    async fn fan_out(&self, streams: Vec<Stream>) -> Vec<HealthResult> {
        let expected = streams.clone();
        let barrier = Arc::new(CompletionBarrier::new());
        let (intake, aggregator) = aggregator::channel(Arc::clone(&barrier));
        let mut collector = tokio::spawn(aggregator.collect().in_current_span());

        let pool = WorkerPool::start(&self.config.pool, Arc::clone(&self.executor), intake.clone());
        for stream in streams {
            dispatch(&pool, &barrier, &intake, stream);
        }

        // A collector that dies early can never count the barrier down.
        let ended_early = tokio::select! {
            _ = barrier.wait() => None,
            joined = &mut collector => Some(joined),
        };
        pool.release().await;
        drop(intake);

        let joined = match ended_early {
            Some(joined) => joined,
            None => collector.await,
        };
        let results = match joined {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, "result aggregator ended abnormally");
                Vec::new()
            }
        };
        backfill_missing(&expected, results)
    }
}

/// Give every submission without a result an `unknown_error` result, so a
/// run always reports one result per submitted stream.
fn backfill_missing(expected: &[Stream], mut results: Vec<HealthResult>) -> Vec<HealthResult> {
    let mut reported: HashMap<i64, usize> = HashMap::new();
    for result in &results {
        *reported.entry(result.stream_id).or_insert(0) += 1;
    }

    for stream in expected {
        match reported.get_mut(&stream.id) {
            Some(count) if *count > 0 => *count -= 1,
            _ => {
                warn!(stream_id = stream.id, "no result collected; reporting unknown_error");
                results.push(HealthResult::failed(
                    stream,
                    HealthStatus::UnknownError,
                    "result lost: aggregator ended before the run completed",
                ));
            }
        }
    }
    results
}

/// Count the stream in, then submit it; a rejection becomes a
/// `queue_error` result on the same intake.
fn dispatch(pool: &WorkerPool, barrier: &CompletionBarrier, intake: &Intake, stream: Stream) {
    barrier.add(1);
    if let Err(err) = pool.submit(stream) {
        obs::emit_dispatch_rejected(err.stream().id, &err);
        METRICS.inc_dispatch_rejections();
        let detail = err.to_string();
        let stream = err.into_stream();
        intake.deliver(HealthResult::failed(&stream, HealthStatus::QueueError, detail));
    }
}

fn warn_on_duplicates(streams: &[Stream]) {
    let mut seen = HashSet::with_capacity(streams.len());
    for stream in streams {
        if !seen.insert(stream.id) {
            warn!(stream_id = stream.id, "duplicate stream id in run; probing each entry");
        }
    }
}
