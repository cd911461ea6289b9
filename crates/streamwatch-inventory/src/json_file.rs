//! JSON file inventory backend.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::provider::{InventoryProvider, InventoryResult};
use crate::schema::Stream;

/// Inventory read from a JSON array of stream records.
///
/// The file is re-read on every call. Records use the keys `id`, `name` and
/// `source_url` (`rtsp_url` is accepted as an alias).
#[derive(Debug, Clone)]
pub struct JsonFileInventory {
    path: PathBuf,
}

impl JsonFileInventory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl InventoryProvider for JsonFileInventory {
    async fn list_streams(&self) -> InventoryResult<Vec<Stream>> {
        let bytes = tokio::fs::read(&self.path).await?;
        let streams: Vec<Stream> = serde_json::from_slice(&bytes)?;
        debug!(path = %self.path.display(), count = streams.len(), "inventory file loaded");
        Ok(streams)
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}
