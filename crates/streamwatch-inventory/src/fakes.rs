//! In-memory fakes for the inventory trait (testing only)
//!
//! Provides `StaticInventory` and `FailingInventory` that satisfy the
//! `InventoryProvider` contract without any external dependencies.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::InventoryError;
use crate::provider::{InventoryProvider, InventoryResult};
use crate::schema::Stream;

// ---------------------------------------------------------------------------
// StaticInventory
// ---------------------------------------------------------------------------

/// In-memory inventory returning a replaceable stream list.
#[derive(Debug, Default)]
pub struct StaticInventory {
    streams: Mutex<Vec<Stream>>,
    calls: AtomicUsize,
}

impl StaticInventory {
    pub fn new(streams: Vec<Stream>) -> Self {
        Self {
            streams: Mutex::new(streams),
            calls: AtomicUsize::new(0),
        }
    }

    /// Replace the list returned by subsequent calls.
    pub fn set_streams(&self, streams: Vec<Stream>) {
        *self.streams.lock().unwrap() = streams;
    }

    /// Number of `list_streams` calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InventoryProvider for StaticInventory {
    async fn list_streams(&self) -> InventoryResult<Vec<Stream>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.streams.lock().unwrap().clone())
    }

    fn describe(&self) -> String {
        "static".to_string()
    }
}

// ---------------------------------------------------------------------------
// FailingInventory
// ---------------------------------------------------------------------------

/// Inventory that fails a configurable number of times, then serves `streams`.
#[derive(Debug, Default)]
pub struct FailingInventory {
    remaining_failures: AtomicUsize,
    streams: Vec<Stream>,
}

impl FailingInventory {
    /// Fail on every call.
    pub fn always() -> Self {
        Self {
            remaining_failures: AtomicUsize::new(usize::MAX),
            streams: Vec::new(),
        }
    }

    /// Fail `failures` times, then return `streams`.
    pub fn then_succeed(failures: usize, streams: Vec<Stream>) -> Self {
        Self {
            remaining_failures: AtomicUsize::new(failures),
            streams,
        }
    }
}

#[async_trait]
impl InventoryProvider for FailingInventory {
    async fn list_streams(&self) -> InventoryResult<Vec<Stream>> {
        let failing = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
                0 => None,
                usize::MAX => Some(usize::MAX),
                n => Some(n - 1),
            })
            .is_ok();

        if failing {
            return Err(InventoryError::MissingConfig {
                vars: vec!["POSTGRES_PASSWORD".to_string()],
            });
        }
        Ok(self.streams.clone())
    }

    fn describe(&self) -> String {
        "failing".to_string()
    }
}
