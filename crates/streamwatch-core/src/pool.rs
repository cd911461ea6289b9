//! Bounded worker pool for probes.
//!
//! Submissions go into a bounded queue. A dispatcher task takes a semaphore
//! permit, then the next queued stream, and spawns a worker holding that
//! permit, so at most `capacity` probes run at once. Submitting never
//! blocks: a full queue or a closed pool hands the stream back inside a
//! [`DispatchError`].

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use futures::FutureExt;
use streamwatch_inventory::Stream;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn, Instrument};

use crate::aggregator::Intake;
use crate::config::PoolConfig;
use crate::domain::{DispatchError, HealthResult, HealthStatus};
use crate::metrics::METRICS;
use crate::obs;
use crate::probe::ProbeExecutor;

/// Fixed-capacity pool of probe workers feeding one [`Intake`].
pub struct WorkerPool {
    queue: Mutex<Option<mpsc::Sender<Stream>>>,
    queue_capacity: usize,
    dispatcher: JoinHandle<()>,
}

impl WorkerPool {
    /// Start the dispatcher. Must be called inside a tokio runtime.
    pub fn start(config: &PoolConfig, executor: Arc<dyn ProbeExecutor>, intake: Intake) -> Self {
        let capacity = config.capacity.max(1);
        let queue_capacity = config.queue_capacity.max(1);
        let (tx, rx) = mpsc::channel(queue_capacity);

        let permits = Arc::new(Semaphore::new(capacity));
        let dispatcher =
            tokio::spawn(dispatch_loop(rx, permits, executor, intake).in_current_span());
        debug!(capacity, queue_capacity, "worker pool started");

        Self {
            queue: Mutex::new(Some(tx)),
            queue_capacity,
            dispatcher,
        }
    }

    /// Queue `stream` for probing without waiting.
    pub fn submit(&self, stream: Stream) -> Result<(), DispatchError> {
        let queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        let Some(tx) = queue.as_ref() else {
            return Err(DispatchError::PoolClosed { stream });
        };

        tx.try_send(stream).map_err(|e| match e {
            TrySendError::Full(stream) => DispatchError::QueueFull {
                capacity: self.queue_capacity,
                stream,
            },
            TrySendError::Closed(stream) => DispatchError::PoolClosed { stream },
        })
    }

    /// Stop accepting submissions. Already queued work still runs.
    pub fn shutdown(&self) {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).take();
    }

    /// Close the queue and wait until every accepted stream has delivered
    /// its result.
    pub async fn release(self) {
        self.shutdown();
        if let Err(e) = self.dispatcher.await {
            warn!(error = %e, "probe dispatcher ended abnormally");
        }
    }
}

async fn dispatch_loop(
    mut queue: mpsc::Receiver<Stream>,
    permits: Arc<Semaphore>,
    executor: Arc<dyn ProbeExecutor>,
    intake: Intake,
) {
    let mut workers = JoinSet::new();

    loop {
        // The semaphore is never closed, so acquiring only waits.
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };
        let Some(stream) = queue.recv().await else {
            break;
        };

        let executor = Arc::clone(&executor);
        let intake = intake.clone();
        workers.spawn(
            async move {
                let _permit = permit;
                run_probe(executor.as_ref(), stream, &intake).await;
            }
            .in_current_span(),
        );
    }

    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "probe worker ended abnormally");
        }
    }
}

async fn run_probe(executor: &dyn ProbeExecutor, stream: Stream, intake: &Intake) {
    let started = Instant::now();
    let result = match AssertUnwindSafe(executor.probe(&stream)).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => HealthResult::failed(
            &stream,
            HealthStatus::UnknownError,
            format!("probe task panicked: {}", panic_message(panic.as_ref())),
        ),
    };

    METRICS.inc_probes_executed();
    if result.status == HealthStatus::TimedOut {
        METRICS.inc_probes_timed_out();
    }
    obs::emit_probe_finished(&result, started.elapsed().as_millis() as u64);
    intake.deliver(result);
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{self, CompletionBarrier};
    use crate::fakes::{ScriptedProbe, ScriptedStep};
    use std::time::Duration;

    fn streams(n: i64) -> Vec<Stream> {
        (1..=n)
            .map(|id| Stream::new(id, format!("cam-{id}"), format!("rtsp://cam-{id}")))
            .collect()
    }

    #[tokio::test]
    async fn test_pool_never_exceeds_capacity() {
        let probe = Arc::new(
            ScriptedProbe::new(Duration::from_secs(5))
                .with_default(ScriptedStep::HealthyAfter(Duration::from_millis(20))),
        );
        let barrier = Arc::new(CompletionBarrier::new());
        let (intake, aggregator) = aggregator::channel(Arc::clone(&barrier));
        let collector = tokio::spawn(aggregator.collect());

        let config = PoolConfig {
            capacity: 3,
            queue_capacity: 64,
        };
        let pool = WorkerPool::start(&config, probe.clone(), intake);
        for stream in streams(12) {
            pool.submit(stream).unwrap();
        }
        pool.release().await;

        let results = collector.await.unwrap();
        assert_eq!(results.len(), 12);
        assert!(probe.peak_concurrency() <= 3);
        assert!(probe.peak_concurrency() >= 2, "pool should run probes in parallel");
    }

    #[tokio::test]
    async fn test_full_queue_hands_stream_back() {
        let probe = Arc::new(ScriptedProbe::new(Duration::from_secs(5)));
        let (intake, _aggregator) = aggregator::channel(Arc::new(CompletionBarrier::new()));
        let config = PoolConfig {
            capacity: 1,
            queue_capacity: 2,
        };
        let pool = WorkerPool::start(&config, probe, intake);

        // No await between submissions: the dispatcher has not drained anything yet.
        let mut input = streams(3).into_iter();
        pool.submit(input.next().unwrap()).unwrap();
        pool.submit(input.next().unwrap()).unwrap();
        let err = pool.submit(input.next().unwrap()).unwrap_err();

        assert!(matches!(err, DispatchError::QueueFull { capacity: 2, .. }));
        assert_eq!(err.stream().id, 3);
        pool.release().await;
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_is_rejected() {
        let probe = Arc::new(ScriptedProbe::new(Duration::from_secs(5)));
        let (intake, _aggregator) = aggregator::channel(Arc::new(CompletionBarrier::new()));
        let pool = WorkerPool::start(&PoolConfig::default(), probe, intake);

        pool.shutdown();
        let err = pool.submit(Stream::new(1, "a", "rtsp://a")).unwrap_err();
        assert!(matches!(err, DispatchError::PoolClosed { .. }));
        pool.release().await;
    }

    #[tokio::test]
    async fn test_panicking_probe_still_yields_result() {
        let probe = Arc::new(
            ScriptedProbe::new(Duration::from_secs(5)).with_step(2, ScriptedStep::Panic),
        );
        let barrier = Arc::new(CompletionBarrier::new());
        let (intake, aggregator) = aggregator::channel(Arc::clone(&barrier));
        let collector = tokio::spawn(aggregator.collect());

        let pool = WorkerPool::start(&PoolConfig::default(), probe, intake);
        for stream in streams(3) {
            pool.submit(stream).unwrap();
        }
        pool.release().await;

        let results = collector.await.unwrap();
        assert_eq!(results.len(), 3);
        let panicked = results.iter().find(|r| r.stream_id == 2).unwrap();
        assert_eq!(panicked.status, HealthStatus::UnknownError);
        assert!(panicked.detail.as_ref().unwrap().contains("panicked"));
    }

    #[test]
    fn test_panic_message_variants() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u8), "non-string panic payload");
    }
}
