//! Inventory provider trait
//!
//! The scheduler asks an `InventoryProvider` for the current stream list at
//! the start of every cycle. Implementations are backend-agnostic:
//! - [`crate::PostgresInventory`]: the `cameras` table in PostgreSQL
//! - [`crate::JsonFileInventory`]: a JSON array on disk
//! - [`crate::fakes`]: in-memory providers for tests

use async_trait::async_trait;

use crate::error::InventoryError;
use crate::schema::Stream;

/// Result type for inventory operations
pub type InventoryResult<T> = std::result::Result<T, InventoryError>;

/// Source of the stream list for one health-check cycle.
///
/// Guarantees:
/// - The returned order is the inventory order (stable between calls when
///   the backing data does not change).
/// - An error means no streams were produced for this cycle; callers must not
///   treat a partial list as complete.
#[async_trait]
pub trait InventoryProvider: Send + Sync {
    /// Return every stream that should be probed this cycle.
    async fn list_streams(&self) -> InventoryResult<Vec<Stream>>;

    /// Short human-readable description of the backend, used in logs.
    fn describe(&self) -> String;
}
