//! Fan-in of probe results.
//!
//! Workers and the dispatcher deliver results through cloneable [`Intake`]
//! handles into one channel. A single [`Aggregator`] drains it and counts
//! every arrival down on the shared [`CompletionBarrier`], which the
//! dispatcher counted up once per submission. The coordinator waits on the
//! barrier instead of polling anything.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::warn;

use crate::domain::HealthResult;

/// Wait-group over a `watch` counter.
#[derive(Debug)]
pub struct CompletionBarrier {
    pending: watch::Sender<usize>,
}

impl Default for CompletionBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionBarrier {
    pub fn new() -> Self {
        let (pending, _) = watch::channel(0);
        Self { pending }
    }

    /// Expect `n` more results.
    pub fn add(&self, n: usize) {
        self.pending.send_modify(|pending| *pending += n);
    }

    /// Record one arrival. Calls beyond the expected count are ignored.
    pub fn done(&self) {
        let mut underflow = false;
        self.pending.send_modify(|pending| match pending.checked_sub(1) {
            Some(left) => *pending = left,
            None => underflow = true,
        });
        if underflow {
            warn!("completion barrier received more arrivals than expected");
        }
    }

    /// Results still outstanding.
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    /// Resolve once every expected result has arrived.
    pub async fn wait(&self) {
        let mut rx = self.pending.subscribe();
        // The sender lives in `self`, so this cannot observe a closed channel.
        let _ = rx.wait_for(|pending| *pending == 0).await;
    }
}

/// Producer handle onto the result channel.
#[derive(Debug, Clone)]
pub struct Intake {
    tx: mpsc::UnboundedSender<HealthResult>,
}

impl Intake {
    /// Hand a result to the aggregator. Returns `false` if it is gone.
    pub fn deliver(&self, result: HealthResult) -> bool {
        match self.tx.send(result) {
            Ok(()) => true,
            Err(mpsc::error::SendError(result)) => {
                warn!(stream_id = result.stream_id, "result dropped: aggregator closed");
                false
            }
        }
    }
}

/// Single consumer of the result channel.
#[derive(Debug)]
pub struct Aggregator {
    rx: mpsc::UnboundedReceiver<HealthResult>,
    barrier: Arc<CompletionBarrier>,
}

impl Aggregator {
    /// Collect until every [`Intake`] has been dropped.
    pub async fn collect(mut self) -> Vec<HealthResult> {
        let mut results = Vec::new();
        while let Some(result) = self.rx.recv().await {
            results.push(result);
            self.barrier.done();
        }
        results
    }
}

/// Create a connected intake/aggregator pair counting down on `barrier`.
pub fn channel(barrier: Arc<CompletionBarrier>) -> (Intake, Aggregator) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Intake { tx }, Aggregator { rx, barrier })
}
