//! Periodic driver: inventory -> run -> sink, once per interval.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use streamwatch_inventory::InventoryProvider;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::coordinator::RunCoordinator;
use crate::domain::{Result, RunReport, WatchError};
use crate::metrics::METRICS;
use crate::obs;
use crate::sink::ResultSink;

/// Drives one run per interval until told to stop. Runs never overlap.
pub struct Scheduler {
    coordinator: Arc<RunCoordinator>,
    inventory: Arc<dyn InventoryProvider>,
    sink: Arc<dyn ResultSink>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(
        coordinator: Arc<RunCoordinator>,
        inventory: Arc<dyn InventoryProvider>,
        sink: Arc<dyn ResultSink>,
        interval: Duration,
    ) -> Self {
        Self {
            coordinator,
            inventory,
            sink,
            interval,
        }
    }

    /// Fetch the inventory, probe every stream and hand the report to the
    /// sink. An inventory failure aborts this cycle only.
    pub async fn run_cycle(&self) -> Result<RunReport> {
        let streams = self.inventory.list_streams().await?;
        debug!(
            source = %self.inventory.describe(),
            streams = streams.len(),
            "inventory loaded"
        );

        let report = self.coordinator.run(streams).await;
        self.sink.deliver(&report).map_err(WatchError::Sink)?;
        Ok(report)
    }

    /// Run the first cycle immediately, then one per interval, until
    /// `shutdown` resolves. Returns the number of completed cycles.
    ///
    /// A cycle already in progress when `shutdown` resolves is finished
    /// first.
    pub async fn run_until<F>(&self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut completed = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            match self.run_cycle().await {
                Ok(_) => completed += 1,
                Err(e) => {
                    METRICS.inc_cycles_skipped();
                    obs::emit_cycle_skipped(&e);
                }
            }
        }

        info!(cycles = completed, "scheduler stopped");
        completed
    }
}
